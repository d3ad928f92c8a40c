/* Reference front end.
 *
 * A minimal three-address IR with just enough surface to exercise the
 * engine: locals, fields, arrays, calls, null branches and returns.
 * Programs are built with [`MethodBuilder`]; methods declared with an
 * empty body are externs, modeled by configuration rules only.
 *
 * The program object is both the [`IrTraits`] and the
 * [`ApplicationGraph`] implementation; statements are (method, index)
 * handles into its method table.
 */

pub mod value;

use std::sync::Arc;

use rustc_hash::FxHashMap;

pub use value::{
    boolean, elem, field, int, local, null, static_field, string, this, Constant, SimpleValue,
};

use crate::ifds::access_path::AccessPath;
use crate::ir::{
    ApplicationGraph, AssignRhs, Assignment, CallExpr, IrTraits, NullImplication, RuntimeConstant,
};
use value::{collect_deref_bases, value_path};

/// A statement handle: method name plus index into its body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimpleStmt {
    pub method: Arc<str>,
    pub index: u32,
}

/// A call site of the reference IR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    callee: Arc<str>,
    instance: Option<SimpleValue>,
    args: Vec<SimpleValue>,
    string_concat: bool,
}

impl CallSite {
    pub fn new(callee: &str) -> Self {
        Self {
            callee: Arc::from(callee),
            instance: None,
            args: Vec::new(),
            string_concat: false,
        }
    }

    /// Receiver of an instance call.
    pub fn on(mut self, instance: SimpleValue) -> Self {
        self.instance = Some(instance);
        self
    }

    pub fn arg(mut self, arg: SimpleValue) -> Self {
        self.args.push(arg);
        self
    }

    /// Marks the call as a synthetic string concatenation.
    pub fn concat(mut self) -> Self {
        self.string_concat = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimpleExpr {
    Value(SimpleValue),
    Call(CallSite),
    NewArray { dims: u32, nullable_elements: bool },
    New,
}

#[derive(Debug, Clone, PartialEq)]
enum StmtKind {
    Assign {
        lhs: SimpleValue,
        rhs: SimpleExpr,
    },
    Call(CallSite),
    /// Branch on `value == null` (`value != null` when negated);
    /// `then_target` is taken when the comparison holds.
    IfNull {
        value: SimpleValue,
        negated: bool,
        then_target: u32,
        else_target: u32,
    },
    Goto {
        target: u32,
    },
    Return {
        value: Option<SimpleValue>,
    },
    Nop,
}

struct MethodInfo {
    name: Arc<str>,
    params: Vec<(Arc<str>, bool)>,
    is_static: bool,
    is_constructor: bool,
    returns_nullable: bool,
    body: Vec<StmtKind>,
}

/// Fluent method constructor. Statement indices are branch targets, so
/// order of the `stmt` calls is the body layout.
pub struct MethodBuilder {
    info: MethodInfo,
}

impl MethodBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            info: MethodInfo {
                name: Arc::from(name),
                params: Vec::new(),
                is_static: true,
                is_constructor: false,
                returns_nullable: false,
                body: Vec::new(),
            },
        }
    }

    pub fn param(mut self, name: &str) -> Self {
        self.info.params.push((Arc::from(name), false));
        self
    }

    /// Parameter that may legally be passed null.
    pub fn nullable_param(mut self, name: &str) -> Self {
        self.info.params.push((Arc::from(name), true));
        self
    }

    pub fn instance_method(mut self) -> Self {
        self.info.is_static = false;
        self
    }

    pub fn constructor(mut self) -> Self {
        self.info.is_static = false;
        self.info.is_constructor = true;
        self
    }

    pub fn returns_nullable(mut self) -> Self {
        self.info.returns_nullable = true;
        self
    }

    pub fn assign(mut self, lhs: SimpleValue, rhs: SimpleValue) -> Self {
        self.info.body.push(StmtKind::Assign {
            lhs,
            rhs: SimpleExpr::Value(rhs),
        });
        self
    }

    pub fn assign_expr(mut self, lhs: SimpleValue, rhs: SimpleExpr) -> Self {
        self.info.body.push(StmtKind::Assign { lhs, rhs });
        self
    }

    pub fn assign_call(mut self, lhs: SimpleValue, call: CallSite) -> Self {
        self.info.body.push(StmtKind::Assign {
            lhs,
            rhs: SimpleExpr::Call(call),
        });
        self
    }

    pub fn assign_new_array(
        mut self,
        lhs: SimpleValue,
        dims: u32,
        nullable_elements: bool,
    ) -> Self {
        self.info.body.push(StmtKind::Assign {
            lhs,
            rhs: SimpleExpr::NewArray {
                dims,
                nullable_elements,
            },
        });
        self
    }

    pub fn call(mut self, call: CallSite) -> Self {
        self.info.body.push(StmtKind::Call(call));
        self
    }

    /// `if (value == null) goto then_target else goto else_target`.
    pub fn if_null(mut self, value: SimpleValue, then_target: u32, else_target: u32) -> Self {
        self.info.body.push(StmtKind::IfNull {
            value,
            negated: false,
            then_target,
            else_target,
        });
        self
    }

    /// `if (value != null) goto then_target else goto else_target`.
    pub fn if_not_null(mut self, value: SimpleValue, then_target: u32, else_target: u32) -> Self {
        self.info.body.push(StmtKind::IfNull {
            value,
            negated: true,
            then_target,
            else_target,
        });
        self
    }

    pub fn goto(mut self, target: u32) -> Self {
        self.info.body.push(StmtKind::Goto { target });
        self
    }

    pub fn ret(mut self, value: SimpleValue) -> Self {
        self.info.body.push(StmtKind::Return { value: Some(value) });
        self
    }

    pub fn ret_void(mut self) -> Self {
        self.info.body.push(StmtKind::Return { value: None });
        self
    }

    pub fn nop(mut self) -> Self {
        self.info.body.push(StmtKind::Nop);
        self
    }
}

/// A program of the reference IR.
#[derive(Default)]
pub struct SimpleProgram {
    methods: FxHashMap<Arc<str>, MethodInfo>,
}

impl SimpleProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, builder: MethodBuilder) -> Self {
        self.add(builder);
        self
    }

    pub fn add(&mut self, builder: MethodBuilder) {
        let info = builder.info;
        self.methods.insert(info.name.clone(), info);
    }

    fn stmt_kind(&self, stmt: &SimpleStmt) -> Option<&StmtKind> {
        self.methods
            .get(&stmt.method)?
            .body
            .get(stmt.index as usize)
    }

    fn call_site(&self, stmt: &SimpleStmt) -> Option<&CallSite> {
        match self.stmt_kind(stmt)? {
            StmtKind::Call(call) => Some(call),
            StmtKind::Assign {
                rhs: SimpleExpr::Call(call),
                ..
            } => Some(call),
            _ => None,
        }
    }

    fn at(method: &Arc<str>, index: u32) -> SimpleStmt {
        SimpleStmt {
            method: method.clone(),
            index,
        }
    }

    fn targets(&self, stmt: &SimpleStmt) -> Vec<u32> {
        let Some(info) = self.methods.get(&stmt.method) else {
            return Vec::new();
        };
        let len = info.body.len() as u32;
        let raw = match info.body.get(stmt.index as usize) {
            Some(StmtKind::Return { .. }) => Vec::new(),
            Some(StmtKind::Goto { target }) => vec![*target],
            Some(StmtKind::IfNull {
                then_target,
                else_target,
                ..
            }) => {
                if then_target == else_target {
                    vec![*then_target]
                } else {
                    vec![*then_target, *else_target]
                }
            }
            Some(_) => vec![stmt.index + 1],
            None => Vec::new(),
        };
        raw.into_iter().filter(|&index| index < len).collect()
    }
}

impl IrTraits for SimpleProgram {
    type Method = Arc<str>;
    type Statement = SimpleStmt;
    type Value = SimpleValue;

    fn method_name(&self, method: &Arc<str>) -> String {
        method.to_string()
    }

    fn is_constructor(&self, method: &Arc<str>) -> bool {
        self.methods
            .get(method)
            .is_some_and(|info| info.is_constructor)
    }

    fn returns_nullable(&self, method: &Arc<str>) -> bool {
        self.methods
            .get(method)
            .is_some_and(|info| info.returns_nullable)
    }

    fn formal_arguments(&self, method: &Arc<str>) -> Vec<SimpleValue> {
        self.methods
            .get(method)
            .map(|info| {
                info.params
                    .iter()
                    .map(|(name, _)| SimpleValue::Local(name.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn nullable_formal_arguments(&self, method: &Arc<str>) -> Vec<SimpleValue> {
        self.methods
            .get(method)
            .map(|info| {
                info.params
                    .iter()
                    .filter(|(_, nullable)| *nullable)
                    .map(|(name, _)| SimpleValue::Local(name.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn this_instance(&self, method: &Arc<str>) -> Option<SimpleValue> {
        let info = self.methods.get(method)?;
        (!info.is_static).then_some(SimpleValue::This)
    }

    fn value_to_path(&self, value: &SimpleValue) -> Option<AccessPath<SimpleValue>> {
        value_path(value)
    }

    fn constant_of(&self, value: &SimpleValue) -> Option<RuntimeConstant> {
        match value {
            SimpleValue::Const(Constant::Null) => Some(RuntimeConstant::Null),
            SimpleValue::Const(Constant::Int(v)) => Some(RuntimeConstant::Int(*v)),
            SimpleValue::Const(Constant::Bool(v)) => Some(RuntimeConstant::Bool(*v)),
            SimpleValue::Const(Constant::Str(v)) => Some(RuntimeConstant::Str(v.to_string())),
            _ => None,
        }
    }

    fn call_expr(&self, stmt: &SimpleStmt) -> Option<CallExpr<Arc<str>, SimpleValue>> {
        let call = self.call_site(stmt)?;
        Some(CallExpr {
            callee: call.callee.clone(),
            instance: call.instance.clone(),
            args: call.args.clone(),
            is_string_concat: call.string_concat,
        })
    }

    fn assignment(&self, stmt: &SimpleStmt) -> Option<Assignment<SimpleValue>> {
        let StmtKind::Assign { lhs, rhs } = self.stmt_kind(stmt)? else {
            return None;
        };
        let rhs = match rhs {
            SimpleExpr::Value(SimpleValue::Const(Constant::Null)) => AssignRhs::NullConstant,
            SimpleExpr::Value(SimpleValue::Const(_)) => AssignRhs::Other,
            SimpleExpr::Value(value) => AssignRhs::Value(value.clone()),
            SimpleExpr::Call(_) => AssignRhs::Call,
            SimpleExpr::NewArray {
                dims,
                nullable_elements,
            } => AssignRhs::NewArray {
                dims: *dims,
                nullable_elements: *nullable_elements,
            },
            SimpleExpr::New => AssignRhs::Other,
        };
        Some(Assignment {
            lhs: lhs.clone(),
            rhs,
        })
    }

    fn is_return(&self, stmt: &SimpleStmt) -> bool {
        matches!(self.stmt_kind(stmt), Some(StmtKind::Return { .. }))
    }

    fn returned_value(&self, stmt: &SimpleStmt) -> Option<SimpleValue> {
        match self.stmt_kind(stmt)? {
            StmtKind::Return { value } => value.clone(),
            _ => None,
        }
    }

    fn null_implication(
        &self,
        stmt: &SimpleStmt,
        successor: &SimpleStmt,
    ) -> Option<(SimpleValue, NullImplication)> {
        if stmt.method != successor.method {
            return None;
        }
        let StmtKind::IfNull {
            value,
            negated,
            then_target,
            else_target,
        } = self.stmt_kind(stmt)?
        else {
            return None;
        };
        let on_condition = if successor.index == *then_target {
            true
        } else if successor.index == *else_target {
            false
        } else {
            return None;
        };
        let implication = match on_condition != *negated {
            true => NullImplication::Null,
            false => NullImplication::NonNull,
        };
        Some((value.clone(), implication))
    }

    fn is_dereferenced_at(&self, path: &AccessPath<SimpleValue>, stmt: &SimpleStmt) -> bool {
        let Some(kind) = self.stmt_kind(stmt) else {
            return false;
        };
        let mut bases = Vec::new();
        let mut call_derefs = |call: &CallSite, bases: &mut Vec<AccessPath<SimpleValue>>| {
            if let Some(instance) = &call.instance {
                if let Some(path) = value_path(instance) {
                    bases.push(path);
                }
                collect_deref_bases(instance, bases);
            }
            for arg in &call.args {
                collect_deref_bases(arg, bases);
            }
        };
        match kind {
            StmtKind::Assign { lhs, rhs } => {
                collect_deref_bases(lhs, &mut bases);
                match rhs {
                    SimpleExpr::Value(value) => collect_deref_bases(value, &mut bases),
                    SimpleExpr::Call(call) => call_derefs(call, &mut bases),
                    _ => {}
                }
            }
            StmtKind::Call(call) => call_derefs(call, &mut bases),
            // Null comparisons and returns read the value without
            // dereferencing it.
            _ => {}
        }
        bases.contains(path)
    }
}

impl ApplicationGraph<SimpleProgram> for SimpleProgram {
    fn successors(&self, stmt: &SimpleStmt) -> Vec<SimpleStmt> {
        self.targets(stmt)
            .into_iter()
            .map(|index| Self::at(&stmt.method, index))
            .collect()
    }

    fn predecessors(&self, stmt: &SimpleStmt) -> Vec<SimpleStmt> {
        let Some(info) = self.methods.get(&stmt.method) else {
            return Vec::new();
        };
        (0..info.body.len() as u32)
            .map(|index| Self::at(&stmt.method, index))
            .filter(|candidate| self.targets(candidate).contains(&stmt.index))
            .collect()
    }

    fn callees(&self, stmt: &SimpleStmt) -> Vec<Arc<str>> {
        let Some(call) = self.call_site(stmt) else {
            return Vec::new();
        };
        match self.methods.get(&call.callee) {
            Some(info) if !info.body.is_empty() => vec![call.callee.clone()],
            _ => Vec::new(),
        }
    }

    fn callers(&self, method: &Arc<str>) -> Vec<SimpleStmt> {
        let mut callers = Vec::new();
        for (name, info) in &self.methods {
            for index in 0..info.body.len() as u32 {
                let stmt = Self::at(name, index);
                if self
                    .call_site(&stmt)
                    .is_some_and(|call| &call.callee == method)
                {
                    callers.push(stmt);
                }
            }
        }
        callers
    }

    fn entry_points(&self, method: &Arc<str>) -> Vec<SimpleStmt> {
        match self.methods.get(method) {
            Some(info) if !info.body.is_empty() => vec![Self::at(method, 0)],
            _ => Vec::new(),
        }
    }

    fn exit_points(&self, method: &Arc<str>) -> Vec<SimpleStmt> {
        let Some(info) = self.methods.get(method) else {
            return Vec::new();
        };
        info.body
            .iter()
            .enumerate()
            .filter(|(_, kind)| matches!(kind, StmtKind::Return { .. }))
            .map(|(index, _)| Self::at(method, index as u32))
            .collect()
    }

    fn method_of(&self, stmt: &SimpleStmt) -> Arc<str> {
        stmt.method.clone()
    }

    fn statements_of(&self, method: &Arc<str>) -> Vec<SimpleStmt> {
        let Some(info) = self.methods.get(method) else {
            return Vec::new();
        };
        (0..info.body.len() as u32)
            .map(|index| Self::at(method, index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ifds::access_path::Accessor;

    fn stmt(method: &str, index: u32) -> SimpleStmt {
        SimpleStmt {
            method: Arc::from(method),
            index,
        }
    }

    fn guard_program() -> SimpleProgram {
        // 0: if (x == null) goto 1 else goto 2
        // 1: return
        // 2: y = x.f
        // 3: return y
        SimpleProgram::new().with(
            MethodBuilder::new("guard")
                .param("x")
                .if_null(local("x"), 1, 2)
                .ret_void()
                .assign(local("y"), field(local("x"), "f"))
                .ret(local("y")),
        )
    }

    #[test]
    fn test_field_chain_becomes_access_path() {
        let program = SimpleProgram::new();
        let value = elem(field(local("x"), "f"));
        let path = program.value_to_path(&value).unwrap();
        assert_eq!(path.base(), Some(&local("x")));
        assert_eq!(path.accessors(), &[Accessor::field("f"), Accessor::Element]);
        assert_eq!(program.value_to_path(&null()), None);
    }

    #[test]
    fn test_static_field_path_has_no_base() {
        let program = SimpleProgram::new();
        let path = program.value_to_path(&static_field("G")).unwrap();
        assert!(path.is_static());
    }

    #[test]
    fn test_successors_follow_branch_targets() {
        let program = guard_program();
        assert_eq!(
            program.successors(&stmt("guard", 0)),
            vec![stmt("guard", 1), stmt("guard", 2)]
        );
        assert_eq!(program.successors(&stmt("guard", 1)), vec![]);
        assert_eq!(program.successors(&stmt("guard", 2)), vec![stmt("guard", 3)]);
    }

    #[test]
    fn test_null_implication_per_branch_edge() {
        let program = guard_program();
        let (value, implication) = program
            .null_implication(&stmt("guard", 0), &stmt("guard", 1))
            .unwrap();
        assert_eq!(value, local("x"));
        assert_eq!(implication, NullImplication::Null);

        let (_, implication) = program
            .null_implication(&stmt("guard", 0), &stmt("guard", 2))
            .unwrap();
        assert_eq!(implication, NullImplication::NonNull);

        assert!(program
            .null_implication(&stmt("guard", 1), &stmt("guard", 2))
            .is_none());
    }

    #[test]
    fn test_field_read_dereferences_instance() {
        let program = guard_program();
        let x = program.value_to_path(&local("x")).unwrap();
        assert!(program.is_dereferenced_at(&x, &stmt("guard", 2)));
        // The null comparison reads x without dereferencing it.
        assert!(!program.is_dereferenced_at(&x, &stmt("guard", 0)));
        // Returning y does not dereference y.
        let y = program.value_to_path(&local("y")).unwrap();
        assert!(!program.is_dereferenced_at(&y, &stmt("guard", 3)));
    }

    #[test]
    fn test_extern_methods_are_not_analyzable() {
        let program = SimpleProgram::new()
            .with(MethodBuilder::new("source").returns_nullable())
            .with(
                MethodBuilder::new("main")
                    .assign_call(local("x"), CallSite::new("source"))
                    .ret_void(),
            );
        assert!(program.callees(&stmt("main", 0)).is_empty());
        assert!(program.entry_points(&Arc::from("source")).is_empty());
        assert!(program.returns_nullable(&Arc::from("source")));
    }

    #[test]
    fn test_call_expr_decomposition() {
        let program = SimpleProgram::new().with(
            MethodBuilder::new("main").call(
                CallSite::new("consume")
                    .on(local("obj"))
                    .arg(local("a"))
                    .arg(int(1)),
            ),
        );
        let call = program.call_expr(&stmt("main", 0)).unwrap();
        assert_eq!(call.callee.as_ref(), "consume");
        assert_eq!(call.instance, Some(local("obj")));
        assert_eq!(call.args, vec![local("a"), int(1)]);
        assert!(!call.is_string_concat);
    }

    #[test]
    fn test_predecessors_invert_successors() {
        let program = guard_program();
        assert_eq!(program.predecessors(&stmt("guard", 0)), vec![]);
        assert_eq!(program.predecessors(&stmt("guard", 1)), vec![stmt("guard", 0)]);
        assert_eq!(program.predecessors(&stmt("guard", 3)), vec![stmt("guard", 2)]);
    }

    #[test]
    fn test_callers_finds_call_sites() {
        let program = SimpleProgram::new()
            .with(MethodBuilder::new("callee").ret_void())
            .with(
                MethodBuilder::new("main")
                    .call(CallSite::new("callee"))
                    .ret_void(),
            );
        assert_eq!(program.callers(&Arc::from("callee")), vec![stmt("main", 0)]);
    }
}
