use serde::{Deserialize, Serialize};

/// A named retrieval source contributing one scored candidate list per query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
	Transcript,
	Visual,
	Summary,
	Lexical,
	Person,
}
impl Channel {
	pub const CONTENT: [Channel; 4] =
		[Channel::Transcript, Channel::Visual, Channel::Summary, Channel::Lexical];

	pub fn as_str(self) -> &'static str {
		match self {
			Channel::Transcript => "transcript",
			Channel::Visual => "visual",
			Channel::Summary => "summary",
			Channel::Lexical => "lexical",
			Channel::Person => "person",
		}
	}

	/// Dense channels are queried with an embedding vector; the rest take text.
	pub fn is_dense(self) -> bool {
		matches!(self, Channel::Transcript | Channel::Visual | Channel::Summary | Channel::Person)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualMode {
	/// The vision-grounded channel participates in retrieval.
	Recall,
	/// The vision-grounded channel only rescores the fused pool.
	Rerank,
	/// The vision-grounded channel is not consulted.
	Skip,
}
impl VisualMode {
	pub fn as_str(self) -> &'static str {
		match self {
			VisualMode::Recall => "recall",
			VisualMode::Rerank => "rerank",
			VisualMode::Skip => "skip",
		}
	}

	pub fn plan(self) -> &'static ModePlan {
		match self {
			VisualMode::Recall => &RECALL_PLAN,
			VisualMode::Rerank => &RERANK_PLAN,
			VisualMode::Skip => &SKIP_PLAN,
		}
	}
}

/// Which content channels a visual mode retrieves from, and whether the vision-grounded
/// query vector is needed at all.
#[derive(Debug, PartialEq, Eq)]
pub struct ModePlan {
	pub retrieval: &'static [Channel],
	pub embed_visual: bool,
	pub rerank: bool,
}

static RECALL_PLAN: ModePlan = ModePlan {
	retrieval: &[Channel::Transcript, Channel::Visual, Channel::Summary, Channel::Lexical],
	embed_visual: true,
	rerank: false,
};
static RERANK_PLAN: ModePlan = ModePlan {
	retrieval: &[Channel::Transcript, Channel::Summary, Channel::Lexical],
	embed_visual: true,
	rerank: true,
};
static SKIP_PLAN: ModePlan = ModePlan {
	retrieval: &[Channel::Transcript, Channel::Summary, Channel::Lexical],
	embed_visual: false,
	rerank: false,
};
