//! Business offer evaluation against a fixed weighted rubric

use std::fmt::Write as _;
use log::debug;
use crate::request::{CompletionResult, Message, RequestOptions};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 10;
pub const DEFAULT_SCORE: u8 = 5;
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// One rubric line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Criterion
{   pub key: &'static str
  , pub name: &'static str
  , /// Percentage weight; all weights sum to 100
    pub weight: u8
  , pub guidance: &'static str
}

pub const RUBRIC: [Criterion; 6] = [
  Criterion
  {   key: "value_proposition"
    , name: "Value proposition"
    , weight: 25
    , guidance: "How clearly the offer solves a real customer problem"
  }
, Criterion
  {   key: "market_demand"
    , name: "Market demand"
    , weight: 20
    , guidance: "Size and urgency of demand in the target market"
  }
, Criterion
  {   key: "pricing"
    , name: "Pricing and margins"
    , weight: 15
    , guidance: "Whether the price is competitive and leaves healthy margins"
  }
, Criterion
  {   key: "competition"
    , name: "Competitive position"
    , weight: 15
    , guidance: "Differentiation against existing alternatives"
  }
, Criterion
  {   key: "execution_risk"
    , name: "Execution risk"
    , weight: 15
    , guidance: "Confidence the offer can be delivered as promised (10 = low risk)"
  }
, Criterion
  {   key: "scalability"
    , name: "Scalability"
    , weight: 10
    , guidance: "Ability to grow volume without proportional cost"
  }
];

const ANALYST_PERSONA: &str
  = "You are an experienced business analyst. You evaluate commercial \
offers objectively, ground every judgement in the scores provided, and \
write concise, actionable feedback.";

pub fn criterion(key: &str) -> Option<&'static Criterion>
{   RUBRIC.iter().find(|c| c.key == key)
}

/// Offer description plus one score per rubric criterion
#[derive(Debug, Clone, PartialEq)]
pub struct OfferInput
{   pub description: String
  , scores: [u8; RUBRIC.len()]
  , pub notes: Option<String>
  , temperature: f32
}

impl OfferInput
{   pub fn new(description: impl Into<String>) -> Self
    {   OfferInput
        {   description: description.into()
          , scores: [DEFAULT_SCORE; RUBRIC.len()]
          , notes: None
          , temperature: DEFAULT_TEMPERATURE
        }
    }

    /// Set a criterion score by key; out-of-range scores are rejected
    pub fn set_score(
      &mut self
    , key: &str
    , score: u8
    ) -> Result<(), crate::error::Error>
    {   if !(MIN_SCORE..=MAX_SCORE).contains(&score)
        {   return Err(crate::error::Error::InvalidRequest(format!(
              "score for {} must be between {} and {}, got {}",
              key, MIN_SCORE, MAX_SCORE, score
            )));
        }
        let index = RUBRIC.iter()
          .position(|c| c.key == key)
          .ok_or_else(|| {
            crate::error::Error::InvalidRequest(format!(
              "unknown criterion: {} (expected one of: {})",
              key,
              RUBRIC.iter().map(|c| c.key).collect::<Vec<_>>().join(", ")
            ))
          })?;
        self.scores[index] = score;
        Ok(())
    }

    /// Parse a `key=score` pair and apply it
    pub fn apply_score_arg(
      &mut self
    , arg: &str
    ) -> Result<(), crate::error::Error>
    {   let (key, value) = arg.split_once('=').ok_or_else(|| {
          crate::error::Error::InvalidRequest(
            format!("expected key=score, got: {}", arg)
          )
        })?;
        let score = value.trim().parse::<u8>().map_err(|_| {
          crate::error::Error::InvalidRequest(
            format!("score for {} is not a number: {}", key, value)
          )
        })?;
        self.set_score(key.trim(), score)
    }

    pub fn score(&self, key: &str) -> Option<u8>
    {   RUBRIC.iter()
          .position(|c| c.key == key)
          .map(|i| self.scores[i])
    }

    /// Slider semantics: values outside [0, 1] snap to the nearest bound
    pub fn set_temperature(&mut self, temperature: f32)
    {   self.temperature = if temperature.is_nan()
        {   DEFAULT_TEMPERATURE
        } else
        {   temperature.clamp(0.0, 1.0)
        };
    }

    pub fn temperature(&self) -> f32
    {   self.temperature
    }

    /// Weighted mean of the criterion scores, in [1, 10]
    pub fn weighted_score(&self) -> f32
    {   let total_weight: u32 = RUBRIC.iter()
          .map(|c| c.weight as u32)
          .sum();
        let weighted: u32 = RUBRIC.iter()
          .zip(self.scores.iter())
          .map(|(c, s)| c.weight as u32 * *s as u32)
          .sum();
        weighted as f32 / total_weight as f32
    }

    /// Render the rubric into a system and a user message
    pub fn render_prompt(&self)
      -> Result<Vec<Message>, crate::error::Error>
    {   let description = self.description.trim();
        if description.is_empty()
        {   return Err(crate::error::Error::InvalidRequest(
              "offer description must not be empty".to_string()
            ));
        }

        let mut prompt = String::new();
        // Writing to a String cannot fail.
        let _ = writeln!(prompt, "Evaluate the following business offer.");
        let _ = writeln!(prompt);
        let _ = writeln!(prompt, "Offer:");
        let _ = writeln!(prompt, "{}", description);
        let _ = writeln!(prompt);
        let _ = writeln!(
          prompt,
          "Scoring rubric (each criterion scored {} to {}):",
          MIN_SCORE, MAX_SCORE
        );
        for (i, (c, score)) in RUBRIC.iter()
          .zip(self.scores.iter())
          .enumerate()
        {   let _ = writeln!(
              prompt,
              "{}. {} (weight {}%): {}/{}. {}.",
              i + 1, c.name, c.weight, score, MAX_SCORE, c.guidance
            );
        }
        let _ = writeln!(prompt);
        let _ = writeln!(
          prompt,
          "Weighted overall score: {:.1}/{}",
          self.weighted_score(), MAX_SCORE
        );
        if let Some(notes) = self.notes.as_deref()
          .map(str::trim)
          .filter(|n| !n.is_empty())
        {   let _ = writeln!(prompt);
            let _ = writeln!(prompt, "Additional notes from the evaluator:");
            let _ = writeln!(prompt, "{}", notes);
        }
        let _ = writeln!(prompt);
        let _ = writeln!(prompt, "Respond with these sections:");
        let _ = writeln!(prompt, "1. Verdict: accept, negotiate, or decline, with one sentence of reasoning.");
        let _ = writeln!(prompt, "2. Strengths: the criteria that support the offer.");
        let _ = writeln!(prompt, "3. Weaknesses: the criteria that undermine it.");
        let _ = write!(prompt, "4. Recommendations: concrete changes that would raise the score.");

        debug!("Rendered offer prompt of {} chars", prompt.len());
        Ok(vec![
          Message::system(ANALYST_PERSONA)
        , Message::user(prompt)
        ])
    }
}

/// Local score plus the model's written evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct OfferEvaluation
{   pub weighted_score: f32
  , pub result: CompletionResult
}

/// Render the offer and send it through the retrying requester.
/// `options.temperature` is replaced by the offer's own temperature.
pub async fn evaluate<T: crate::providers::ChatTransport>(
  requester: &crate::client::CompletionRequester<T>
, offer: &OfferInput
, options: &RequestOptions
) -> Result<OfferEvaluation, crate::error::Error>
{   let messages = offer.render_prompt()?;
    let options = options.clone()
      .with_temperature(Some(offer.temperature()));
    let result = requester.request_with(messages, &options).await;
    Ok(OfferEvaluation
    {   weighted_score: offer.weighted_score()
      , result
    })
}
