//! Board layers and their string ids

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A board layer
///
/// Copper layers are ordered from top to bottom, so `Ord` gives the stackup
/// order of `TopCopper`, `InnerCopper(1..)` and `BotCopper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Layer {
    BoardOutlines,
    TopCopper,
    /// Inner copper layer, numbered from 1 below the top
    InnerCopper(u8),
    BotCopper,
    TopLegend,
    BotLegend,
}

impl Layer {
    pub fn is_copper(self) -> bool {
        matches!(self, Layer::TopCopper | Layer::InnerCopper(_) | Layer::BotCopper)
    }

    /// Counterpart on the other side of the board
    pub fn mirrored(self, inner_layer_count: u8) -> Layer {
        match self {
            Layer::TopCopper => Layer::BotCopper,
            Layer::BotCopper => Layer::TopCopper,
            Layer::InnerCopper(n) if n >= 1 && n <= inner_layer_count => {
                Layer::InnerCopper(inner_layer_count + 1 - n)
            }
            Layer::TopLegend => Layer::BotLegend,
            Layer::BotLegend => Layer::TopLegend,
            other => other,
        }
    }

    pub fn id(self) -> String {
        match self {
            Layer::BoardOutlines => "board_outlines".to_string(),
            Layer::TopCopper => "top_cu".to_string(),
            Layer::InnerCopper(n) => format!("in{}_cu", n),
            Layer::BotCopper => "bot_cu".to_string(),
            Layer::TopLegend => "top_legend".to_string(),
            Layer::BotLegend => "bot_legend".to_string(),
        }
    }
}

/// All copper layers of a board with the given number of inner layers
pub fn copper_layers(inner_layer_count: u8) -> Vec<Layer> {
    let mut layers = Vec::with_capacity(inner_layer_count as usize + 2);
    layers.push(Layer::TopCopper);
    layers.extend((1..=inner_layer_count).map(Layer::InnerCopper));
    layers.push(Layer::BotCopper);
    layers
}

/// Copper layers from `start` to `end` inclusive, in either order
pub fn copper_span(start: Layer, end: Layer, inner_layer_count: u8) -> Vec<Layer> {
    let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
    copper_layers(inner_layer_count)
        .into_iter()
        .filter(|l| *l >= lo && *l <= hi)
        .collect()
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

impl FromStr for Layer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "board_outlines" => Ok(Layer::BoardOutlines),
            "top_cu" => Ok(Layer::TopCopper),
            "bot_cu" => Ok(Layer::BotCopper),
            "top_legend" => Ok(Layer::TopLegend),
            "bot_legend" => Ok(Layer::BotLegend),
            _ => s
                .strip_prefix("in")
                .and_then(|rest| rest.strip_suffix("_cu"))
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|n| *n >= 1)
                .map(Layer::InnerCopper)
                .ok_or_else(|| format!("unknown layer id '{}'", s)),
        }
    }
}

impl From<Layer> for String {
    fn from(layer: Layer) -> String {
        layer.id()
    }
}

impl TryFrom<String> for Layer {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
