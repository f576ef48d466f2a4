// This file is part of marsh, a cooperative multitasking toolkit and shell.
// Copyright (C) 2026 the marsh authors

//! Splitting a command line into pipelines joined by connectors

use crate::syntax::{Command, Expr};
use std::iter::Peekable;
use std::slice;

/// How a pipeline is joined to the one before it
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Connector {
    /// `&&`: run only if the previous pipeline succeeded.
    AndThen,
    /// `||`: run only if the previous pipeline failed.
    OrElse,
}

/// A command line reduced to pipelines and the connectors between them
///
/// `connectors[i]` joins `pipelines[i]` to `pipelines[i + 1]`. Well-formed
/// input yields exactly `pipelines.len() - 1` connectors; malformed input
/// (a stray `|`, doubled operators) may yield fewer, and a missing
/// connector means the next pipeline runs unconditionally.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Plan {
    pub pipelines: Vec<Vec<Command>>,
    pub connectors: Vec<Connector>,
}

/// Groups consecutive piped commands into pipelines.
///
/// Walks the expressions left to right, accumulating commands separated by
/// [`Expr::Pipe`] into one pipeline and closing it on `&&`/`||`. Malformed
/// sequences never panic: a pipe with no command after it ends the current
/// pipeline, and connectors with no pipeline on either side are dropped.
pub fn split(exprs: &[Expr]) -> Plan {
    let mut plan = Plan::default();
    let mut exprs = exprs.iter().peekable();

    while exprs.peek().is_some() {
        let pipeline = next_pipeline(&mut exprs);
        if !pipeline.is_empty() {
            plan.pipelines.push(pipeline);
        }
        match exprs.peek() {
            Some(Expr::And) => {
                exprs.next();
                plan.connectors.push(Connector::AndThen);
            }
            Some(Expr::Or) => {
                exprs.next();
                plan.connectors.push(Connector::OrElse);
            }
            Some(Expr::Pipe) => {
                // Stray pipe between pipelines; drop it.
                exprs.next();
            }
            _ => {}
        }
    }

    if plan.pipelines.is_empty() {
        plan.connectors.clear();
    } else {
        plan.connectors.truncate(plan.pipelines.len() - 1);
    }
    plan
}

/// Consumes one pipeline: a command and any `| command` continuations.
///
/// Returns an empty pipeline without consuming anything if the next
/// expression is not a command. A pipe not followed by a command is
/// consumed and ends the pipeline.
fn next_pipeline(exprs: &mut Peekable<slice::Iter<'_, Expr>>) -> Vec<Command> {
    let mut pipeline = Vec::new();
    let Some(Expr::Command(first)) = exprs.peek() else {
        return pipeline;
    };
    pipeline.push(first.clone());
    exprs.next();

    while let Some(Expr::Pipe) = exprs.peek() {
        exprs.next();
        match exprs.peek() {
            Some(Expr::Command(command)) => {
                pipeline.push(command.clone());
                exprs.next();
            }
            _ => break,
        }
    }
    pipeline
}
