// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Applying module operations to an environment and undoing them exactly.
//!
//! Every operation captures the variable's value immediately before it runs,
//! so the recorded inverse restores the prior string verbatim. List edits
//! (`prepend`/`append`) remember where their segments landed rather than
//! what they contained, which keeps removal correct when the same segment
//! appears more than once.

use serde::{Deserialize, Serialize};

use crate::environment::{EnvOp, EnvironmentState};

#[cfg(test)]
#[path = "./diff_test.rs"]
mod diff_test;

/// Which end of a list variable a segment run was inserted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Front,
    Back,
}

/// State of a list variable before segments were inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prior {
    Absent,
    Empty,
    Present,
}

/// One step of undo information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum InverseOp {
    /// Put back the value held before a `set`/`unset`.
    ///
    /// Only applies while the variable still holds `applied`.
    Restore {
        variable: String,
        prior: Option<String>,
        applied: Option<String>,
    },
    /// Take out the run of segments a `prepend`/`append` inserted.
    ///
    /// `offset` counts the segments that were already present, measured from
    /// the end opposite to `side`, which later edits on `side` do not shift.
    RemoveSegments {
        variable: String,
        segments: Vec<String>,
        separator: String,
        side: Side,
        offset: usize,
        prior: Prior,
    },
}

impl InverseOp {
    pub fn variable(&self) -> &str {
        match self {
            Self::Restore { variable, .. } | Self::RemoveSegments { variable, .. } => variable,
        }
    }
}

/// Undo information for a whole module, stored in application order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InverseDiff {
    ops: Vec<InverseOp>,
}

impl InverseDiff {
    pub fn ops(&self) -> &[InverseOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Apply `ops` in declared order, returning the new state and its inverse.
///
/// The input state is left untouched.
pub fn apply(ops: &[EnvOp], state: &EnvironmentState) -> (EnvironmentState, InverseDiff) {
    let mut next = state.clone();
    let mut inverse = Vec::with_capacity(ops.len());
    for op in ops {
        if let Some(undo) = apply_one(op, &mut next) {
            inverse.push(undo);
        }
    }
    (next, InverseDiff { ops: inverse })
}

/// Undo a previously applied diff, newest operation first.
pub fn apply_inverse(inverse: &InverseDiff, state: &EnvironmentState) -> EnvironmentState {
    let mut next = state.clone();
    for op in inverse.ops.iter().rev() {
        undo_one(op, &mut next);
    }
    next
}

/// Hand the `set`/`unset` restores of `inverse` over to diffs applied after it.
///
/// A later diff that overwrote one of these variables recorded this diff's
/// value as its prior, so undoing out of order would put that value back.
/// The nearest later restore of the variable inherits this diff's prior
/// instead, and the returned diff no longer touches the variable.
pub fn splice<'a, I>(inverse: &InverseDiff, later: I) -> InverseDiff
where
    I: IntoIterator<Item = &'a mut InverseDiff>,
{
    let mut later: Vec<&'a mut InverseDiff> = later.into_iter().collect();
    let mut handed_over: Vec<&str> = Vec::new();
    for (variable, first_prior, last_applied) in restore_chains(inverse) {
        for diff in later.iter_mut() {
            let successor = diff.ops.iter_mut().find(|op| {
                matches!(op, InverseOp::Restore { variable: v, .. } if v.as_str() == variable)
            });
            let Some(InverseOp::Restore { prior, .. }) = successor else {
                continue;
            };
            if *prior == last_applied {
                tracing::trace!(%variable, "splicing restore into a later module");
                *prior = first_prior;
                handed_over.push(variable);
            }
            break;
        }
    }

    let ops = inverse
        .ops
        .iter()
        .filter(|op| {
            !(matches!(op, InverseOp::Restore { .. }) && handed_over.contains(&op.variable()))
        })
        .cloned()
        .collect();
    InverseDiff { ops }
}

/// Per variable, the prior of the first restore and the value of the last one.
fn restore_chains(inverse: &InverseDiff) -> Vec<(&str, Option<String>, Option<String>)> {
    let mut chains: Vec<(&str, Option<String>, Option<String>)> = Vec::new();
    for op in &inverse.ops {
        let InverseOp::Restore {
            variable,
            prior,
            applied,
        } = op
        else {
            continue;
        };
        match chains.iter_mut().find(|(v, ..)| *v == variable.as_str()) {
            Some(chain) => chain.2 = applied.clone(),
            None => chains.push((variable.as_str(), prior.clone(), applied.clone())),
        }
    }
    chains
}

fn apply_one(op: &EnvOp, state: &mut EnvironmentState) -> Option<InverseOp> {
    let variable = op.variable().to_string();
    let prior = state.get(&variable).map(str::to_owned);
    tracing::trace!(%variable, kind = %op.kind(), "applying");

    match op {
        EnvOp::Set(set) => {
            state.set(variable.clone(), set.value.clone());
            Some(InverseOp::Restore {
                variable,
                prior,
                applied: Some(set.value.clone()),
            })
        }
        EnvOp::Unset(_) => {
            // unsetting an absent variable changes nothing, so there is nothing to undo
            let prior = prior?;
            state.unset(&variable);
            Some(InverseOp::Restore {
                variable,
                prior: Some(prior),
                applied: None,
            })
        }
        EnvOp::Prepend(_) | EnvOp::Append(_) => {
            let separator = op.separator().to_string();
            let inserted = split(op.value().unwrap_or_default(), &separator);
            let (mut segments, prior) = match prior.as_deref() {
                None => (Vec::new(), Prior::Absent),
                Some("") => (Vec::new(), Prior::Empty),
                Some(value) => (split(value, &separator), Prior::Present),
            };
            let offset = segments.len();
            let side = match op {
                EnvOp::Prepend(_) => {
                    segments.splice(0..0, inserted.iter().cloned());
                    Side::Front
                }
                _ => {
                    segments.extend(inserted.iter().cloned());
                    Side::Back
                }
            };
            state.set(variable.clone(), segments.join(&separator));
            Some(InverseOp::RemoveSegments {
                variable,
                segments: inserted,
                separator,
                side,
                offset,
                prior,
            })
        }
    }
}

fn undo_one(op: &InverseOp, state: &mut EnvironmentState) {
    match op {
        InverseOp::Restore {
            variable,
            prior,
            applied,
        } => {
            if state.get(variable) != applied.as_deref() {
                tracing::warn!(
                    %variable,
                    "variable changed since the module edited it, leaving current value in place"
                );
                return;
            }
            state.assign(variable, prior.clone());
        }
        InverseOp::RemoveSegments {
            variable,
            segments: inserted,
            separator,
            side,
            offset,
            prior,
        } => {
            let Some(current) = state.get(variable) else {
                tracing::warn!(%variable, "variable was removed outside of modenv, nothing to undo");
                return;
            };
            let mut segments = if current.is_empty() {
                Vec::new()
            } else {
                split(current, separator)
            };

            let expected = match side {
                Side::Front => segments.len().checked_sub(offset + inserted.len()),
                Side::Back => Some(*offset),
            };
            let start = expected
                .filter(|&start| run_at(&segments, start, inserted))
                .or_else(|| {
                    tracing::debug!(%variable, "segments moved, searching for inserted run");
                    find_run(&segments, inserted, *side)
                });
            let Some(start) = start else {
                tracing::warn!(
                    %variable,
                    segments = %inserted.join(separator),
                    "inserted segments no longer present, leaving current value in place"
                );
                return;
            };
            segments.drain(start..start + inserted.len());

            if segments.is_empty() {
                match prior {
                    Prior::Absent => {
                        state.unset(variable);
                    }
                    Prior::Empty | Prior::Present => state.set(variable.as_str(), ""),
                }
            } else {
                state.set(variable.as_str(), segments.join(separator));
            }
        }
    }
}

fn split(value: &str, separator: &str) -> Vec<String> {
    value.split(separator).map(String::from).collect()
}

fn run_at(segments: &[String], start: usize, run: &[String]) -> bool {
    segments.get(start..start + run.len()) == Some(run)
}

/// Locate `run` searching from the end it was inserted at.
fn find_run(segments: &[String], run: &[String], side: Side) -> Option<usize> {
    if run.is_empty() || run.len() > segments.len() {
        return None;
    }
    let mut windows = segments.windows(run.len());
    match side {
        Side::Front => windows.position(|w| w == run),
        Side::Back => windows.rposition(|w| w == run),
    }
}
