// codegen.rs — CUDA source emission
//
// Lowers a parsed kernel definition into a `__global__` kernel body and
// assembles the full per-record output (template header, kernel, host
// wrappers). The execution model is one thread per element: a top-level
// counted loop becomes a guard on `thread_id`, and inside any loop body
// the name `i` is the thread-index sentinel.
//
// Lowering is all-or-nothing: any construct outside the supported subset
// aborts the record with `GenError::Unsupported`.

use crate::ast::*;
use crate::diag::GenError;
use crate::launch;
use crate::parser;
use crate::registry::{classify, device_name, Classification, KernelSpec, Registry};
use crate::signature::{
    child_params, instantiation_types, parent_params, template_bindings, template_param_list,
    Param,
};

// ── Output sink ─────────────────────────────────────────────────────────────

/// Indentation-tracking text sink. Two spaces per level.
pub(crate) struct CodeSink {
    out: String,
    indent: usize,
}

impl CodeSink {
    pub(crate) fn new() -> Self {
        CodeSink {
            out: String::new(),
            indent: 0,
        }
    }

    pub(crate) fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    pub(crate) fn blank(&mut self) {
        self.out.push('\n');
    }

    pub(crate) fn push(&mut self) {
        self.indent += 1;
    }

    pub(crate) fn pop(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    pub(crate) fn into_string(self) -> String {
        self.out
    }
}

// ── Scope ───────────────────────────────────────────────────────────────────

/// Local declarations made along the current lexical path. Keys are the
/// lowered target texts. Cloned for probe passes at branch points.
#[derive(Debug, Clone, Default)]
struct Scope {
    declared: Vec<String>,
}

impl Scope {
    fn contains(&self, target: &str) -> bool {
        self.declared.iter().any(|d| d == target)
    }

    fn declare(&mut self, target: String) {
        self.declared.push(target);
    }

    /// Targets declared here but not in `base`, in declaration order.
    fn newly_declared(&self, base: &Scope) -> Vec<String> {
        self.declared[base.declared.len()..].to_vec()
    }
}

// ── Lowerer ─────────────────────────────────────────────────────────────────

struct Lowerer<'a> {
    kernel: &'a str,
    params: Vec<String>,
}

impl<'a> Lowerer<'a> {
    fn new(kernel: &'a str, params: Vec<String>) -> Self {
        Lowerer { kernel, params }
    }

    fn is_param(&self, name: &str) -> bool {
        self.params.iter().any(|p| p == name)
    }

    // ── Statements ──

    fn stmt(
        &self,
        sink: &mut CodeSink,
        stmt: &Stmt,
        in_loop: bool,
        scope: &mut Scope,
    ) -> Result<(), GenError> {
        match &stmt.kind {
            StmtKind::For { bounds, body, .. } => self.for_stmt(sink, bounds, body, scope),
            StmtKind::While { test, body } => self.while_stmt(sink, test, body, scope),
            StmtKind::If {
                test,
                then_body,
                else_body,
            } => self.if_stmt(sink, test, then_body, else_body, in_loop, scope),
            StmtKind::Assign { target, value } => {
                self.assign(sink, target, None, value, in_loop, scope)
            }
            StmtKind::AugAssign { target, op, value } => {
                if *op != AugOp::Add {
                    return Err(GenError::unsupported(
                        self.kernel,
                        format!("augmented assignment `{}`", op.symbol()),
                    ));
                }
                self.assign(sink, target, Some("+="), value, in_loop, scope)
            }
        }
    }

    /// `for i in range(...)` → a guard on `thread_id`. The body executes
    /// with the sentinel active.
    fn for_stmt(
        &self,
        sink: &mut CodeSink,
        bounds: &[Expr],
        body: &[Stmt],
        scope: &mut Scope,
    ) -> Result<(), GenError> {
        let guard = match bounds {
            [upper] => format!("if (thread_id < {}) {{", self.expr(upper, false)?),
            [lower, upper] => format!(
                "if ((thread_id < {}) && (thread_id >= {})) {{",
                self.expr(upper, false)?,
                self.expr(lower, false)?
            ),
            _ => {
                return Err(GenError::unsupported(
                    self.kernel,
                    format!("range with {} bounds", bounds.len()),
                ))
            }
        };
        sink.line(&guard);
        sink.push();
        for s in body {
            self.stmt(sink, s, true, scope)?;
        }
        sink.pop();
        sink.line("}");
        Ok(())
    }

    fn while_stmt(
        &self,
        sink: &mut CodeSink,
        test: &Expr,
        body: &[Stmt],
        scope: &mut Scope,
    ) -> Result<(), GenError> {
        let cond = match &test.kind {
            ExprKind::Compare { .. } => self.cond(test, true)?,
            _ => {
                return Err(GenError::unsupported(
                    self.kernel,
                    "while test that is not a single comparison",
                ))
            }
        };
        sink.line(&format!("while ({cond}) {{"));
        sink.push();
        for s in body {
            self.stmt(sink, s, true, scope)?;
        }
        sink.pop();
        sink.line("}");
        Ok(())
    }

    /// Branch lowering with declaration hoisting.
    ///
    /// The positive arm is first lowered into a scratch sink with a cloned
    /// scope; the names it would declare are hoisted as `int64_t` locals
    /// before the branch so both arms assign without re-declaring. Only the
    /// positive arm is probed; a name first assigned in the negative arm
    /// keeps its inline declaration there (longstanding behavior, kept).
    /// The `else` block is emitted even when empty.
    fn if_stmt(
        &self,
        sink: &mut CodeSink,
        test: &Expr,
        then_body: &[Stmt],
        else_body: &[Stmt],
        in_loop: bool,
        scope: &mut Scope,
    ) -> Result<(), GenError> {
        let mut probe_scope = scope.clone();
        let mut scratch = CodeSink::new();
        for s in then_body {
            self.stmt(&mut scratch, s, in_loop, &mut probe_scope)?;
        }
        for name in probe_scope.newly_declared(scope) {
            sink.line(&format!("int64_t {name};"));
            scope.declare(name);
        }

        sink.line(&format!("if ({}) {{", self.cond(test, in_loop)?));
        sink.push();
        for s in then_body {
            self.stmt(sink, s, in_loop, scope)?;
        }
        sink.pop();
        sink.line("} else {");
        sink.push();
        for s in else_body {
            self.stmt(sink, s, in_loop, scope)?;
        }
        sink.pop();
        sink.line("}");
        Ok(())
    }

    // ── Assignments ──
    //
    // `op` is `None` for plain `=` and `Some("+=")` for compound form.
    // A first assignment to a non-parameter local is declaration-annotated:
    // `auto` for plain targets, initialised-from-negative-value for ternary
    // RHS. Two quirks of the established output are kept deliberately: a
    // bare-sentinel RHS always emits `=`, and the declaration-annotated
    // compound forms keep the `+=`.

    fn assign(
        &self,
        sink: &mut CodeSink,
        target: &Expr,
        op: Option<&str>,
        value: &Expr,
        in_loop: bool,
        scope: &mut Scope,
    ) -> Result<(), GenError> {
        let target_text = self.expr(target, in_loop)?;
        let root = target.root_name().ok_or_else(|| {
            GenError::unsupported(self.kernel, "assignment target without a root name")
        })?;
        let is_local = !self.is_param(root);
        let op = op.unwrap_or("=");

        // Bare sentinel RHS: always a plain `=` from `thread_id`.
        if matches!(&value.kind, ExprKind::Name(n) if n == "i") {
            let auto = self.annotate(&target_text, is_local, scope);
            sink.line(&format!("{auto}{target_text} = thread_id;"));
            return Ok(());
        }

        match &value.kind {
            ExprKind::Ternary { test, body, orelse } => {
                let orelse_text = self.expr(orelse, in_loop)?;
                if is_local && !scope.contains(&target_text) {
                    sink.line(&format!("auto {target_text} {op} {orelse_text};"));
                    scope.declare(target_text.clone());
                }
                sink.line(&format!("if ({}) {{", self.cond(test, in_loop)?));
                sink.push();
                sink.line(&format!(
                    "{target_text} {op} {};",
                    self.expr(body, in_loop)?
                ));
                sink.pop();
                sink.line("} else {");
                sink.push();
                sink.line(&format!("{target_text} {op} {orelse_text};"));
                sink.pop();
                sink.line("}");
                Ok(())
            }
            ExprKind::Compare { .. } => {
                let cond = self.cond(value, in_loop)?;
                let auto = self.annotate(&target_text, is_local, scope);
                sink.line(&format!("{auto}{target_text} {op} {cond};"));
                Ok(())
            }
            _ => {
                let value_text = self.expr(value, in_loop)?;
                let auto = self.annotate(&target_text, is_local, scope);
                sink.line(&format!("{auto}{target_text} {op} {value_text};"));
                Ok(())
            }
        }
    }

    /// `"auto "` on the first assignment to an undeclared local, else `""`.
    fn annotate(&self, target_text: &str, is_local: bool, scope: &mut Scope) -> &'static str {
        if is_local && !scope.contains(target_text) {
            scope.declare(target_text.to_string());
            "auto "
        } else {
            ""
        }
    }

    // ── Expressions ──

    /// A comparison in condition position: bare `lhs op rhs` (the caller
    /// supplies the single pair of parentheses). Non-comparisons lower
    /// through the general path.
    fn cond(&self, e: &Expr, in_loop: bool) -> Result<String, GenError> {
        match &e.kind {
            ExprKind::Compare { op, lhs, rhs } => {
                let op = self.cmp_op(*op)?;
                Ok(format!(
                    "{} {op} {}",
                    self.expr(lhs, in_loop)?,
                    self.expr(rhs, in_loop)?
                ))
            }
            _ => self.expr(e, in_loop),
        }
    }

    fn cmp_op(&self, op: CmpOp) -> Result<&'static str, GenError> {
        if op == CmpOp::Le {
            return Err(GenError::unsupported(self.kernel, "comparison `<=`"));
        }
        Ok(op.symbol())
    }

    fn expr(&self, e: &Expr, in_loop: bool) -> Result<String, GenError> {
        match &e.kind {
            ExprKind::Name(n) => {
                if in_loop && n == "i" {
                    Ok("thread_id".to_string())
                } else {
                    Ok(n.clone())
                }
            }
            ExprKind::Int(n) => Ok(n.to_string()),
            ExprKind::Bool(b) => Ok(if *b { "true" } else { "false" }.to_string()),
            ExprKind::Binary { op, lhs, rhs } => {
                // Operands that lowered to the bare sentinel still become
                // the thread index, even outside loop context.
                let mut l = self.expr(lhs, in_loop)?;
                let mut r = self.expr(rhs, in_loop)?;
                if l == "i" {
                    l = "thread_id".to_string();
                }
                if r == "i" {
                    r = "thread_id".to_string();
                }
                Ok(format!("({l} {} {r})", op.symbol()))
            }
            ExprKind::Compare { op, lhs, rhs } => {
                let op = self.cmp_op(*op)?;
                Ok(format!(
                    "({} {op} {})",
                    self.expr(lhs, in_loop)?,
                    self.expr(rhs, in_loop)?
                ))
            }
            ExprKind::Subscript { base, index } => self.subscript(base, index, in_loop),
            ExprKind::Call { callee, args } => {
                if args.len() != 1 {
                    return Err(GenError::unsupported(
                        self.kernel,
                        format!("call with {} arguments", args.len()),
                    ));
                }
                let f = match &callee.kind {
                    ExprKind::Name(n) => n.clone(),
                    _ => {
                        return Err(GenError::unsupported(
                            self.kernel,
                            "call through a non-name callee",
                        ))
                    }
                };
                Ok(format!("({f})({})", self.expr(&args[0], in_loop)?))
            }
            ExprKind::Ternary { .. } => Err(GenError::unsupported(
                self.kernel,
                "conditional expression outside assignment",
            )),
        }
    }

    fn subscript(&self, base: &Expr, index: &Expr, in_loop: bool) -> Result<String, GenError> {
        match &base.kind {
            ExprKind::Name(b) => {
                // The sentinel index is rewritten unconditionally.
                if matches!(&index.kind, ExprKind::Name(n) if n == "i") {
                    return Ok(format!("{b}[thread_id]"));
                }
                match &index.kind {
                    ExprKind::Int(_)
                    | ExprKind::Name(_)
                    | ExprKind::Binary { .. }
                    | ExprKind::Subscript { .. } => {
                        Ok(format!("{b}[{}]", self.expr(index, in_loop)?))
                    }
                    _ => self.expr(index, in_loop),
                }
            }
            ExprKind::Subscript {
                base: inner_base,
                index: inner_index,
            } => {
                // Two-level subscript; the inner parts lower outside loop
                // context.
                Ok(format!(
                    "{}[{}][{}]",
                    self.expr(inner_base, false)?,
                    self.expr(inner_index, false)?,
                    self.expr(index, in_loop)?
                ))
            }
            _ => self.expr(index, in_loop),
        }
    }
}

/// Lower an expression outside loop context with no parameter set. Used
/// for launch-bound expressions.
pub(crate) fn lower_bound_expr(kernel: &str, e: &Expr) -> Result<String, GenError> {
    Lowerer::new(kernel, Vec::new()).expr(e, false)
}

// ── Per-record generation ───────────────────────────────────────────────────

fn join_decls(params: &[Param]) -> String {
    params
        .iter()
        .map(Param::decl)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Generate the kernel definition and host wrapper(s) for one record.
pub fn generate_kernel(spec: &KernelSpec) -> Result<String, GenError> {
    let parsed = parser::parse(&spec.definition);
    if let Some(err) = parsed.errors.first() {
        return Err(GenError::Parse {
            kernel: spec.name.clone(),
            message: err.to_string(),
        });
    }
    let def = parsed.def.ok_or_else(|| GenError::Parse {
        kernel: spec.name.clone(),
        message: "empty definition".to_string(),
    })?;

    let bindings = template_bindings(spec);
    let params = parent_params(spec);
    let symbol = device_name(&spec.name);

    let mut sink = CodeSink::new();
    if let Some(header) = template_param_list(&bindings) {
        sink.line(&header);
    }
    sink.line("__global__");
    sink.line(&format!("void {symbol}({}) {{", join_decls(&params)));
    sink.push();
    sink.line("int64_t block_id = blockIdx.x + blockIdx.y * gridDim.x + gridDim.x * gridDim.y * blockIdx.z;");
    sink.line("int64_t thread_id = block_id * blockDim.x + threadIdx.x;");

    let lowerer = Lowerer::new(
        &spec.name,
        spec.args.iter().map(|a| a.name.clone()).collect(),
    );
    let mut scope = Scope::default();
    for stmt in &def.body {
        lowerer.stmt(&mut sink, stmt, false, &mut scope)?;
    }
    sink.pop();
    sink.line("}");

    let bound = launch::iteration_bound(&spec.name, &def)?;
    if spec.specializations.is_empty() {
        sink.blank();
        launch::emit_wrapper(&mut sink, &spec.name, &params, &symbol, &[], &bound);
    } else {
        for child in &spec.specializations {
            sink.blank();
            let cparams = child_params(spec, child);
            let types = instantiation_types(child, &bindings);
            launch::emit_wrapper(&mut sink, &child.name, &cparams, &symbol, &types, &bound);
        }
    }
    Ok(sink.into_string())
}

// ── Full-stream generation ──────────────────────────────────────────────────

const HEADERS: &[&str] = &["operations", "indexing", "identities", "reducers"];

fn preamble(registry: &Registry) -> String {
    let mut out = String::new();
    out.push_str("// Generated by rkc. Do not edit.\n");
    out.push_str(&format!("// spec-fingerprint: {}\n\n", registry.fingerprint()));
    for header in HEADERS {
        out.push_str(&format!("#include \"ragged/kernels/{header}.h\"\n"));
    }
    out.push_str("#include <cstdio>\n\n");
    out
}

/// Generate the full output stream: preamble, then every eligible record
/// (or just `target`) in registry iteration order.
pub fn generate(registry: &Registry, target: Option<&str>) -> Result<String, GenError> {
    let mut out = preamble(registry);
    match target {
        Some(name) => {
            let spec = registry.get(name).ok_or_else(|| GenError::NotFound {
                name: name.to_string(),
            })?;
            match classify(name) {
                Some(Classification::Eligible) => {}
                Some(c) => {
                    return Err(GenError::NotEligible {
                        name: name.to_string(),
                        classification: c.label(),
                    })
                }
                None => {
                    return Err(GenError::NotEligible {
                        name: name.to_string(),
                        classification: "unclassified",
                    })
                }
            }
            out.push_str(&generate_kernel(spec)?);
        }
        None => {
            for spec in registry.eligible() {
                out.push_str(&generate_kernel(spec)?);
                out.push('\n');
            }
        }
    }
    Ok(out)
}

// ── Tests ───────────────────────────────────────────────────────────────────
