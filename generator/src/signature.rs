// signature.rs — Kernel signature and template synthesis
//
// Derives the C parameter lists for a kernel and its specializations, and
// synthesizes single-letter template parameters for argument positions
// where the specializations disagree on the concrete type.

use crate::registry::{KernelSpec, Specialization, TypeDesc};

// ── Position reduction ──────────────────────────────────────────────────────

/// Result of reducing one argument position across all specializations.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionType {
    /// Every specialization agrees on this concrete type.
    Same(TypeDesc),
    /// The specializations disagree; the position gets a template letter.
    Generic(char),
}

/// Reduce each argument position across the spec's specializations.
///
/// Letters are assigned `A`, `B`, ... in position order of first
/// disagreement and never reused, so the result is deterministic.
pub fn position_types(spec: &KernelSpec) -> Vec<PositionType> {
    let mut next_letter = b'A';
    let mut out = Vec::with_capacity(spec.args.len());
    for pos in 0..spec.args.len() {
        let mut tys = spec.specializations.iter().map(|c| &c.args[pos].ty);
        let reduced = match tys.next() {
            None => PositionType::Same(spec.args[pos].ty.clone()),
            Some(first) => {
                if tys.all(|t| t == first) {
                    PositionType::Same(first.clone())
                } else {
                    let letter = next_letter as char;
                    next_letter += 1;
                    PositionType::Generic(letter)
                }
            }
        };
        out.push(reduced);
    }
    out
}

// ── Template bindings ───────────────────────────────────────────────────────

/// An argument position bound to a synthesized template letter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateBinding {
    pub position: usize,
    pub arg_name: String,
    pub letter: char,
}

/// The template bindings of a spec: one per generic position, in order.
pub fn template_bindings(spec: &KernelSpec) -> Vec<TemplateBinding> {
    position_types(spec)
        .into_iter()
        .enumerate()
        .filter_map(|(position, pt)| match pt {
            PositionType::Generic(letter) => Some(TemplateBinding {
                position,
                arg_name: spec.args[position].name.clone(),
                letter,
            }),
            PositionType::Same(_) => None,
        })
        .collect()
}

/// `template <typename A, typename B>`, or `None` when nothing is generic.
pub fn template_param_list(bindings: &[TemplateBinding]) -> Option<String> {
    if bindings.is_empty() {
        return None;
    }
    let params: Vec<String> = bindings
        .iter()
        .map(|b| format!("typename {}", b.letter))
        .collect();
    Some(format!("template <{}>", params.join(", ")))
}

// ── Parameter rendering ─────────────────────────────────────────────────────

/// One rendered C parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: String,
}

impl Param {
    pub fn decl(&self) -> String {
        format!("{} {}", self.ty, self.name)
    }
}

fn render(ty: &TypeDesc, is_outparam: bool) -> String {
    let mut text = ty.ctype();
    // Output parameters are always passed through a pointer, even when
    // the descriptor itself is scalar.
    if is_outparam && ty.depth == 0 {
        text.push('*');
    }
    text
}

/// Parameters of the kernel definition itself. With specializations the
/// concrete types come from the first child, with template letters
/// substituted at generic positions.
pub fn parent_params(spec: &KernelSpec) -> Vec<Param> {
    let positions = position_types(spec);
    let source: &[crate::registry::KernelArg] = match spec.specializations.first() {
        Some(child) => &child.args,
        None => &spec.args,
    };
    source
        .iter()
        .zip(positions.iter())
        .map(|(arg, pt)| {
            let out = spec.is_outparam(&arg.name);
            let ty = match pt {
                PositionType::Generic(letter) => {
                    render(&arg.ty.with_base(&letter.to_string()), out)
                }
                PositionType::Same(_) => render(&arg.ty, out),
            };
            Param {
                name: arg.name.clone(),
                ty,
            }
        })
        .collect()
}

/// Concrete parameters of one specialization.
pub fn child_params(spec: &KernelSpec, child: &Specialization) -> Vec<Param> {
    child
        .args
        .iter()
        .map(|arg| Param {
            name: arg.name.clone(),
            ty: render(&arg.ty, spec.is_outparam(&arg.name)),
        })
        .collect()
}

/// Concrete template-argument types for instantiating one specialization,
/// in binding order. Pointer depth and `const` are stripped.
pub fn instantiation_types(child: &Specialization, bindings: &[TemplateBinding]) -> Vec<String> {
    bindings
        .iter()
        .map(|b| child.args[b.position].ty.base.clone())
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::KernelArg;

    fn arg(name: &str, ty: &str) -> KernelArg {
        KernelArg {
            name: name.to_string(),
            ty: TypeDesc::parse(ty),
        }
    }

    fn templated_spec() -> KernelSpec {
        KernelSpec {
            name: "ragged_regular_num".to_string(),
            args: vec![
                arg("tonum", "List[int64_t]"),
                arg("size", "int64_t"),
                arg("length", "int64_t"),
            ],
            outparams: vec!["tonum".to_string()],
            definition: String::new(),
            specializations: vec![
                Specialization {
                    name: "ragged_regular_num_int32".to_string(),
                    args: vec![
                        arg("tonum", "List[int32_t]"),
                        arg("size", "int64_t"),
                        arg("length", "int64_t"),
                    ],
                },
                Specialization {
                    name: "ragged_regular_num_int64".to_string(),
                    args: vec![
                        arg("tonum", "List[int64_t]"),
                        arg("size", "int64_t"),
                        arg("length", "int64_t"),
                    ],
                },
            ],
        }
    }

    #[test]
    fn no_specializations_no_bindings() {
        let spec = KernelSpec {
            name: "ragged_zero_mask".to_string(),
            args: vec![arg("mask", "List[int8_t]"), arg("length", "int64_t")],
            outparams: vec!["mask".to_string()],
            definition: String::new(),
            specializations: Vec::new(),
        };
        assert!(template_bindings(&spec).is_empty());
        assert_eq!(template_param_list(&[]), None);
        let params = parent_params(&spec);
        assert_eq!(params[0].decl(), "int8_t* mask");
        assert_eq!(params[1].decl(), "int64_t length");
    }

    #[test]
    fn disagreeing_position_gets_letter() {
        let spec = templated_spec();
        let bindings = template_bindings(&spec);
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].position, 0);
        assert_eq!(bindings[0].arg_name, "tonum");
        assert_eq!(bindings[0].letter, 'A');
        assert_eq!(
            template_param_list(&bindings),
            Some("template <typename A>".to_string())
        );
    }

    #[test]
    fn letters_follow_position_order() {
        let mut spec = templated_spec();
        // Make the third position disagree too.
        spec.specializations[1].args[2] = arg("length", "int32_t");
        let bindings = template_bindings(&spec);
        assert_eq!(bindings.len(), 2);
        assert_eq!((bindings[0].letter, bindings[0].position), ('A', 0));
        assert_eq!((bindings[1].letter, bindings[1].position), ('B', 2));
    }

    #[test]
    fn parent_params_substitute_letter() {
        let spec = templated_spec();
        let params = parent_params(&spec);
        assert_eq!(params[0].decl(), "A* tonum");
        assert_eq!(params[1].decl(), "int64_t size");
        assert_eq!(params[2].decl(), "int64_t length");
    }

    #[test]
    fn child_params_are_concrete() {
        let spec = templated_spec();
        let params = child_params(&spec, &spec.specializations[0]);
        assert_eq!(params[0].decl(), "int32_t* tonum");
    }

    #[test]
    fn scalar_outparam_is_pointer() {
        let spec = KernelSpec {
            name: "ragged_list_min_range".to_string(),
            args: vec![arg("min", "int64_t"), arg("length", "int64_t")],
            outparams: vec!["min".to_string()],
            definition: String::new(),
            specializations: Vec::new(),
        };
        let params = parent_params(&spec);
        assert_eq!(params[0].decl(), "int64_t* min");
        assert_eq!(params[1].decl(), "int64_t length");
    }

    #[test]
    fn instantiation_strips_wrapping() {
        let spec = templated_spec();
        let bindings = template_bindings(&spec);
        let types = instantiation_types(&spec.specializations[0], &bindings);
        assert_eq!(types, vec!["int32_t".to_string()]);
    }

    #[test]
    fn const_survives_letter_substitution() {
        let mut spec = templated_spec();
        spec.specializations[0].args[0] = arg("tonum", "const List[int32_t]");
        spec.outparams.clear();
        let params = parent_params(&spec);
        assert_eq!(params[0].decl(), "const A* tonum");
    }
}
