mod check;
pub mod config;
mod edit;
mod order;
mod resolve;

pub use check::*;
pub use edit::*;
pub use order::*;
pub use resolve::*;

use clap::ValueEnum;
use lp_overlay::PriorityRule;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleArg {
    /// Mods later in the load order win
    LaterWins,
    /// Mods earlier in the load order win
    EarlierWins,
}

impl From<RuleArg> for PriorityRule {
    fn from(rule: RuleArg) -> Self {
        match rule {
            RuleArg::LaterWins => PriorityRule::LaterWins,
            RuleArg::EarlierWins => PriorityRule::EarlierWins,
        }
    }
}

pub(crate) fn rule_label(rule: PriorityRule) -> &'static str {
    match rule {
        PriorityRule::LaterWins => "later-wins",
        PriorityRule::EarlierWins => "earlier-wins",
    }
}
