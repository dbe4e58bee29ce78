use clap::ValueEnum;
use serde::Serialize;

use super::{EncodedRecord, TransactionRecord};

/// Probabilities at or above this value are labelled fraudulent. The same rule
/// drives the label and every colour-coded view of the probability.
pub const DECISION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
pub enum Label {
    Fraudulent,
    Legitimate,
}

impl Label {
    pub fn from_probability(probability: f64) -> Self {
        if probability >= DECISION_THRESHOLD {
            Label::Fraudulent
        } else {
            Label::Legitimate
        }
    }

    pub fn headline(self) -> &'static str {
        match self {
            Label::Fraudulent => "Fraudulent Transaction",
            Label::Legitimate => "Legitimate Transaction",
        }
    }

    pub fn caption(self) -> &'static str {
        match self {
            Label::Fraudulent => "FRAUD RISK",
            Label::Legitimate => "LEGITIMATE",
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Clone, Copy)]
pub struct Prediction {
    pub label: Label,
    pub probability: f64,
}

impl Prediction {
    pub fn from_probability(probability: f64) -> Self {
        Self {
            label: Label::from_probability(probability),
            probability,
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq, Hash, Clone, Copy, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    Fraud,
    Legit,
}

/// Where the scored record came from.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Manual,
    FraudSample,
    LegitSample,
}

impl InteractionKind {
    pub fn heading(self) -> &'static str {
        match self {
            InteractionKind::Manual => "Manual Input Data",
            InteractionKind::FraudSample => "Fraud Sample Data",
            InteractionKind::LegitSample => "Legit Sample Data",
        }
    }
}

impl From<PoolKind> for InteractionKind {
    fn from(kind: PoolKind) -> Self {
        match kind {
            PoolKind::Fraud => InteractionKind::FraudSample,
            PoolKind::Legit => InteractionKind::LegitSample,
        }
    }
}

/// Outcome of one user action, replaced wholesale by the next one.
#[derive(Debug, PartialEq, Clone)]
pub struct Interaction {
    pub kind: InteractionKind,
    pub record: TransactionRecord,
    pub encoded: EncodedRecord,
    pub prediction: Prediction,
}
