// This module defines the InvariantChecker trait, the post-pass oracle the
// legalization pipeline consults after rewriting. The trait is the seam that lets a
// caller plug in the invariant rules owned by another stage; closures implement it
// too. ModuleInvariants is the default structural checker: unique value ids, an
// entry point that names a real function, non-empty blocks that end in exactly one
// terminator, operands and parameters that reference declared values, single
// definition of every result, and no recursion through Call instructions. Recursion
// is found with a three-state depth-first walk over the call graph. Every finding
// is an Error diagnostic tagged with the "invariant" stage.

//! Module-invariant checking.

use std::collections::{HashMap, HashSet};

use super::{IrDiagnostic, IrFunction, IrModule, ValueId};

/// Stage tag carried by invariant diagnostics.
pub const INVARIANT_STAGE: &str = "invariant";

/// Read-only structural check run after rewriting.
pub trait InvariantChecker {
    /// Diagnostics for every invariant `module` violates; never mutates it.
    fn check(&self, module: &IrModule) -> Vec<IrDiagnostic>;
}

impl<F> InvariantChecker for F
where
    F: Fn(&IrModule) -> Vec<IrDiagnostic>,
{
    fn check(&self, module: &IrModule) -> Vec<IrDiagnostic> {
        self(module)
    }
}

/// Default structural invariants of a well-formed module.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModuleInvariants;

impl ModuleInvariants {
    pub fn new() -> Self {
        Self
    }
}

impl InvariantChecker for ModuleInvariants {
    fn check(&self, module: &IrModule) -> Vec<IrDiagnostic> {
        let mut diagnostics = Vec::new();

        let declared = check_value_table(module, &mut diagnostics);
        check_entry_point(module, &mut diagnostics);
        for function in &module.functions {
            check_blocks(function, &mut diagnostics);
            check_references(function, &declared, &mut diagnostics);
        }
        check_single_definition(module, &mut diagnostics);
        check_recursion(module, &mut diagnostics);

        log::debug!("invariant check found {} problem(s)", diagnostics.len());
        diagnostics
    }
}

fn error(message: String) -> IrDiagnostic {
    IrDiagnostic::error(message, INVARIANT_STAGE)
}

fn check_value_table(module: &IrModule, diagnostics: &mut Vec<IrDiagnostic>) -> HashSet<ValueId> {
    let mut declared = HashSet::with_capacity(module.values.len());
    let mut reported = HashSet::new();
    for value in module.values.iter() {
        if !declared.insert(value.id) && reported.insert(value.id) {
            diagnostics.push(error(format!("Value id {} is declared more than once.", value.id)));
        }
    }
    declared
}

fn check_entry_point(module: &IrModule, diagnostics: &mut Vec<IrDiagnostic>) {
    let Some(entry) = &module.entry_point else {
        return;
    };
    if module.functions.is_empty() || entry.function.is_empty() {
        return;
    }
    if module.function(&entry.function).is_none() {
        diagnostics.push(error(format!(
            "Entry point function '{}' is not defined in the module.",
            entry.function
        )));
    }
}

fn check_blocks(function: &IrFunction, diagnostics: &mut Vec<IrDiagnostic>) {
    for block in &function.blocks {
        let Some((last, body)) = block.instructions.split_last() else {
            diagnostics.push(error(format!(
                "Block '{}' in function '{}' is empty.",
                block.id, function.name
            )));
            continue;
        };

        if !last.terminator {
            diagnostics.push(error(format!(
                "Block '{}' in function '{}' does not end with a terminator (last op '{}').",
                block.id, function.name, last.op
            )));
        }

        for instr in body.iter().filter(|i| i.terminator) {
            diagnostics.push(error(format!(
                "Terminator '{}' appears before the end of block '{}' in function '{}'.",
                instr.op, block.id, function.name
            )));
        }
    }
}

fn check_references(function: &IrFunction, declared: &HashSet<ValueId>, diagnostics: &mut Vec<IrDiagnostic>) {
    for param in &function.parameters {
        if !declared.contains(param) {
            diagnostics.push(error(format!(
                "Parameter of function '{}' references undefined value {}.",
                function.name, param
            )));
        }
    }

    for block in &function.blocks {
        for instr in &block.instructions {
            let undefined = instr
                .operands
                .iter()
                .chain(instr.result.iter())
                .filter(|id| !declared.contains(id));
            for id in undefined {
                diagnostics.push(error(format!(
                    "Instruction '{}' in block '{}' of function '{}' references undefined value {}.",
                    instr.op, block.id, function.name, id
                )));
            }
        }
    }
}

fn check_single_definition(module: &IrModule, diagnostics: &mut Vec<IrDiagnostic>) {
    let mut defined = HashSet::new();
    let mut reported = HashSet::new();
    for result in module.instructions().filter_map(|i| i.result) {
        if !defined.insert(result) && reported.insert(result) {
            diagnostics.push(error(format!("Value {result} is defined by more than one instruction.")));
        }
    }
}

/// Call-graph walk state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    OnStack,
    Done,
}

fn check_recursion(module: &IrModule, diagnostics: &mut Vec<IrDiagnostic>) {
    let index: HashMap<&str, usize> = module
        .functions
        .iter()
        .enumerate()
        .map(|(i, f)| (f.name.as_str(), i))
        .collect();

    // Calls name their callee through the instruction tag.
    let callees: Vec<Vec<usize>> = module
        .functions
        .iter()
        .map(|f| {
            let mut out: Vec<usize> = f
                .blocks
                .iter()
                .flat_map(|b| b.instructions.iter())
                .filter(|i| i.op.eq_ignore_ascii_case("call"))
                .filter_map(|i| i.tag.as_deref())
                .filter_map(|name| index.get(name).copied())
                .collect();
            out.dedup();
            out
        })
        .collect();

    let mut state = vec![VisitState::Unvisited; module.functions.len()];
    let mut reported = HashSet::new();

    for root in 0..module.functions.len() {
        if state[root] != VisitState::Unvisited {
            continue;
        }
        // Explicit stack of (function, next callee slot).
        let mut stack = vec![(root, 0usize)];
        state[root] = VisitState::OnStack;

        while let Some(top) = stack.last_mut() {
            let func = top.0;
            let next = callees[func].get(top.1).copied();
            top.1 += 1;

            if let Some(callee) = next {
                match state[callee] {
                    VisitState::Unvisited => {
                        state[callee] = VisitState::OnStack;
                        stack.push((callee, 0));
                    }
                    VisitState::OnStack => {
                        if reported.insert(callee) {
                            diagnostics.push(error(format!(
                                "Recursion detected involving function '{}'.",
                                module.functions[callee].name
                            )));
                        }
                    }
                    VisitState::Done => {}
                }
            } else {
                state[func] = VisitState::Done;
                stack.pop();
            }
        }
    }
}
