use serde_json::json;

use ndef_hce::reader::Exchange;
use ndef_hce::Selection;

/// How exchanges are printed to stdout.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

impl Format {
    pub fn new(json: bool) -> Self {
        match json {
            true => Format::Json,
            _ => Format::Text,
        }
    }

    /// Renders an exchange along with the selection the card ended up with.
    pub fn exchange(&self, exchange: &Exchange, selection: Selection) -> String {
        match self {
            Format::Text => format!(
                "> {}\n< {}    [{:?}]",
                hex::encode_upper(&exchange.command),
                hex::encode_upper(&exchange.response),
                selection,
            ),
            Format::Json => json!({
                "command": hex::encode_upper(&exchange.command),
                "response": hex::encode_upper(&exchange.response),
                "selection": selection,
            })
            .to_string(),
        }
    }
}
