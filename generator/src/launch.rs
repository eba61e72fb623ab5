// launch.rs — Launch configuration and host wrappers
//
// Discovers the iteration count of a kernel definition (the single
// distinct bound among its top-level loops) and emits the host-callable
// wrapper that sizes the grid, launches the kernel, and synchronizes.

use crate::ast::{CmpOp, ExprKind, FnDef, StmtKind};
use crate::codegen::{lower_bound_expr, CodeSink};
use crate::diag::GenError;
use crate::signature::Param;

/// The launch bound of a definition body.
///
/// For a counted loop this is the upper range bound; for a `while` it is
/// the right-hand side of its `<` test. A body with no loop launches one
/// thread. More than one distinct bound is ambiguous and rejected.
pub fn iteration_bound(kernel: &str, def: &FnDef) -> Result<String, GenError> {
    let mut bounds: Vec<String> = Vec::new();
    let mut record = |text: String| {
        if !bounds.contains(&text) {
            bounds.push(text);
        }
    };
    for stmt in &def.body {
        match &stmt.kind {
            StmtKind::For {
                bounds: range_args, ..
            } => {
                let upper = range_args.last().ok_or_else(|| {
                    GenError::unsupported(kernel, "range with 0 bounds")
                })?;
                record(lower_bound_expr(kernel, upper)?);
            }
            StmtKind::While { test, .. } => match &test.kind {
                ExprKind::Compare {
                    op: CmpOp::Lt,
                    rhs,
                    ..
                } => {
                    record(lower_bound_expr(kernel, rhs)?);
                }
                _ => {
                    return Err(GenError::unsupported(
                        kernel,
                        "while loop whose bound is not a `<` comparison",
                    ))
                }
            },
            _ => {}
        }
    }
    match bounds.len() {
        0 => Ok("1".to_string()),
        1 => Ok(bounds.pop().unwrap_or_default()),
        _ => Err(GenError::AmbiguousBound {
            kernel: kernel.to_string(),
            bounds,
        }),
    }
}

/// Emit one host wrapper: grid sizing, launch, synchronize, `success()`.
///
/// A bound of at most 1024 threads fits one block; larger bounds tile
/// into 1024-thread blocks.
pub(crate) fn emit_wrapper(
    sink: &mut CodeSink,
    name: &str,
    params: &[Param],
    kernel_symbol: &str,
    template_types: &[String],
    bound: &str,
) {
    let decls = params
        .iter()
        .map(Param::decl)
        .collect::<Vec<_>>()
        .join(", ");
    let names = params
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    sink.line(&format!("ERROR {name}({decls}) {{"));
    sink.push();
    sink.line("dim3 blocks_per_grid;");
    sink.line("dim3 threads_per_block;");
    sink.blank();
    sink.line(&format!("if ({bound} > 1024) {{"));
    sink.push();
    sink.line(&format!(
        "blocks_per_grid = dim3(ceil({bound} / 1024.0), 1, 1);"
    ));
    sink.line("threads_per_block = dim3(1024, 1, 1);");
    sink.pop();
    sink.line("} else {");
    sink.push();
    sink.line("blocks_per_grid = dim3(1, 1, 1);");
    sink.line(&format!("threads_per_block = dim3({bound}, 1, 1);"));
    sink.pop();
    sink.line("}");

    let call = if template_types.is_empty() {
        format!("{kernel_symbol}<<<blocks_per_grid, threads_per_block>>>({names});")
    } else {
        format!(
            "{kernel_symbol}<{}> <<<blocks_per_grid, threads_per_block>>>({names});",
            template_types.join(", ")
        )
    };
    sink.line(&call);
    sink.line("cudaDeviceSynchronize();");
    sink.line("return success();");
    sink.pop();
    sink.line("}");
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn def_of(source: &str) -> FnDef {
        let result = parser::parse(source);
        assert!(result.errors.is_empty(), "parse errors: {:?}", result.errors);
        result.def.expect("no definition")
    }

    #[test]
    fn single_loop_uses_its_bound() {
        let def = def_of("def f(out, n):\n    for i in range(n):\n        out[i] = i\n");
        assert_eq!(iteration_bound("k", &def).unwrap(), "n");
    }

    #[test]
    fn two_bound_loop_uses_upper() {
        let def = def_of("def f(out, a, n):\n    for i in range(a, n):\n        out[i] = i\n");
        assert_eq!(iteration_bound("k", &def).unwrap(), "n");
    }

    #[test]
    fn while_loop_uses_lt_rhs() {
        let def = def_of("def f(k, n):\n    while k < n:\n        k = k + 1\n");
        assert_eq!(iteration_bound("k", &def).unwrap(), "n");
    }

    #[test]
    fn while_without_lt_rejected() {
        let def = def_of("def f(k, n):\n    while k > n:\n        k = k + 1\n");
        let err = iteration_bound("k", &def).unwrap_err();
        assert!(matches!(err, GenError::Unsupported { .. }));
    }

    #[test]
    fn loopless_body_launches_one_thread() {
        let def = def_of("def f(out):\n    out[0] = 1\n");
        assert_eq!(iteration_bound("k", &def).unwrap(), "1");
    }

    #[test]
    fn repeated_bound_is_not_ambiguous() {
        let def = def_of(concat!(
            "def f(a, b, n):\n",
            "    for i in range(n):\n",
            "        a[i] = 0\n",
            "    for i in range(n):\n",
            "        b[i] = 0\n"
        ));
        assert_eq!(iteration_bound("k", &def).unwrap(), "n");
    }

    #[test]
    fn distinct_bounds_are_ambiguous() {
        let def = def_of(concat!(
            "def f(a, b, n, m):\n",
            "    for i in range(n):\n",
            "        a[i] = 0\n",
            "    for i in range(m):\n",
            "        b[i] = 0\n"
        ));
        match iteration_bound("k", &def).unwrap_err() {
            GenError::AmbiguousBound { bounds, .. } => {
                assert_eq!(bounds, vec!["n".to_string(), "m".to_string()]);
            }
            other => panic!("expected AmbiguousBound, got: {other}"),
        }
    }

    #[test]
    fn wrapper_text_shape() {
        let mut sink = CodeSink::new();
        let params = vec![
            Param {
                name: "mask".to_string(),
                ty: "int8_t*".to_string(),
            },
            Param {
                name: "length".to_string(),
                ty: "int64_t".to_string(),
            },
        ];
        emit_wrapper(
            &mut sink,
            "ragged_zero_mask",
            &params,
            "cuda_zero_mask",
            &[],
            "length",
        );
        let text = sink.into_string();
        assert_eq!(
            text,
            concat!(
                "ERROR ragged_zero_mask(int8_t* mask, int64_t length) {\n",
                "  dim3 blocks_per_grid;\n",
                "  dim3 threads_per_block;\n",
                "\n",
                "  if (length > 1024) {\n",
                "    blocks_per_grid = dim3(ceil(length / 1024.0), 1, 1);\n",
                "    threads_per_block = dim3(1024, 1, 1);\n",
                "  } else {\n",
                "    blocks_per_grid = dim3(1, 1, 1);\n",
                "    threads_per_block = dim3(length, 1, 1);\n",
                "  }\n",
                "  cuda_zero_mask<<<blocks_per_grid, threads_per_block>>>(mask, length);\n",
                "  cudaDeviceSynchronize();\n",
                "  return success();\n",
                "}\n"
            )
        );
    }

    #[test]
    fn templated_launch_lists_types() {
        let mut sink = CodeSink::new();
        let params = vec![Param {
            name: "tonum".to_string(),
            ty: "int32_t*".to_string(),
        }];
        emit_wrapper(
            &mut sink,
            "ragged_regular_num_int32",
            &params,
            "cuda_regular_num",
            &["int32_t".to_string()],
            "length",
        );
        let text = sink.into_string();
        assert!(text
            .contains("cuda_regular_num<int32_t> <<<blocks_per_grid, threads_per_block>>>(tonum);"));
    }
}
