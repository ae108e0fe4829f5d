//! Property path compiler
//!
//! Rewrites a path into an ordered list of patterns chained through synthetic
//! intermediate variables. Intermediates are named after a caller-supplied scope,
//! so two paths compiled with different scopes never share one.

use super::algebra::{PathFlavor, PathStep, Pattern, PatternTerm, PropertyPath, Variable};

struct PathCompiler<'s> {
    scope: &'s str,
    next_synthetic: usize,
}

impl PathCompiler<'_> {
    fn fresh(&mut self) -> PatternTerm {
        let var = Variable::scoped_synthetic(self.scope, self.next_synthetic);
        self.next_synthetic += 1;
        PatternTerm::Variable(var)
    }
}

/// Compile a path into patterns, with unscoped intermediates (`?__PP0`, ...)
pub fn compile(path: &PropertyPath) -> Vec<Pattern> {
    compile_scoped(path, "")
}

/// Compile a path into patterns
///
/// Consecutive alternative steps share one start/end pair and are flagged as
/// unions, except the last of the run. Sequence steps advance the start to the
/// previous end.
pub fn compile_scoped(path: &PropertyPath, scope: &str) -> Vec<Pattern> {
    let steps = path.steps();
    if let [step] = steps {
        return vec![step_pattern(path.start(), step, path.end())];
    }

    let mut compiler = PathCompiler {
        scope,
        next_synthetic: 0,
    };
    let mut patterns = Vec::with_capacity(steps.len());
    let mut start = path.start().clone();
    let last = steps.len() - 1;
    let mut i = 0;

    while i < steps.len() {
        let run_end = match steps[i].flavor() {
            PathFlavor::Alternative => steps[i..]
                .iter()
                .position(|s| s.flavor() != PathFlavor::Alternative)
                .map_or(last, |offset| i + offset - 1),
            PathFlavor::Sequence => i,
        };
        let end = if run_end == last {
            path.end().clone()
        } else {
            compiler.fresh()
        };

        for (k, step) in steps.iter().enumerate().take(run_end + 1).skip(i) {
            let pattern = step_pattern(&start, step, &end);
            patterns.push(if k < run_end { pattern.union() } else { pattern });
        }

        start = end;
        i = run_end + 1;
    }

    patterns
}

fn step_pattern(start: &PatternTerm, step: &PathStep, end: &PatternTerm) -> Pattern {
    let property = PatternTerm::from(step.property().clone());
    if step.is_inverse() {
        Pattern::new(end.clone(), property, start.clone())
    } else {
        Pattern::new(start.clone(), property, end.clone())
    }
}
