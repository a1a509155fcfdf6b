pub mod channel;
pub mod cjk;
pub mod intent;
pub mod person;

pub use channel::{Channel, ModePlan, VisualMode};
pub use intent::{IntentDecision, LookupRule, QueryLanguage, classify};
pub use person::{KnownPerson, PersonMatch, detect_person};
