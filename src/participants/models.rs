use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub unique_code: String,
    pub name: String,
    /// Set once the participant crossed the finish line.
    #[serde(rename = "isCrossed")]
    pub is_crossed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum LookupResponse {
    Enveloped { data: Participant },
    Bare(Participant),
}

impl LookupResponse {
    pub(crate) fn into_participant(self) -> Participant {
        match self {
            LookupResponse::Enveloped { data } => data,
            LookupResponse::Bare(participant) => participant,
        }
    }
}
