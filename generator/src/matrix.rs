// matrix.rs — Numeric conversion boilerplate matrix
//
// Expands the fixed catalogue of scalar numeric types into the full
// pairwise cross-product and stamps out conversion-function text from one
// of three fixed templates: header declarations, implementation stubs, or
// dispatch specializations.

use std::fmt;
use std::str::FromStr;

/// The scalar type catalogue: `(catalogue name, C++ spelling)`, in
/// emission order.
pub const TYPE_CATALOGUE: [(&str, &str); 13] = [
    ("bool", "bool"),
    ("int8", "int8_t"),
    ("int16", "int16_t"),
    ("int32", "int32_t"),
    ("int64", "int64_t"),
    ("uint8", "uint8_t"),
    ("uint16", "uint16_t"),
    ("uint32", "uint32_t"),
    ("uint64", "uint64_t"),
    ("float32", "float"),
    ("float64", "double"),
    ("complex64", "std::complex<float>"),
    ("complex128", "std::complex<double>"),
];

/// Which boilerplate file the blocks are destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillCategory {
    /// Exported header declarations.
    Declaration,
    /// Implementation stubs forwarding to the untyped filler.
    Stub,
    /// `kernel::lib` dispatch specializations.
    Dispatch,
}

impl FromStr for FillCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "declaration" => Ok(FillCategory::Declaration),
            "stub" => Ok(FillCategory::Stub),
            "dispatch" => Ok(FillCategory::Dispatch),
            other => Err(format!(
                "unknown category '{other}' (expected declaration, stub, or dispatch)"
            )),
        }
    }
}

impl fmt::Display for FillCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FillCategory::Declaration => "declaration",
            FillCategory::Stub => "stub",
            FillCategory::Dispatch => "dispatch",
        };
        write!(f, "{s}")
    }
}

fn declaration_block(np_from: &str, np_to: &str, cpp_from: &str, cpp_to: &str) -> String {
    format!(
        "/// @param toptr outparam
  /// @param tooffset inparam role: index-offset
  /// @param fromptr inparam role: array-ptr
  /// @param length inparam
  EXPORT_SYMBOL struct Error
  ragged_numeric_fill_to{np_to}_from{np_from}(
    {cpp_to} * toptr,
    int64_t tooffset,
    const {cpp_from} * fromptr,
    int64_t length);"
    )
}

fn stub_block(np_from: &str, np_to: &str, cpp_from: &str, cpp_to: &str) -> String {
    format!(
        "ERROR
  ragged_numeric_fill_to{np_to}_from{np_from}({cpp_to}* toptr,
                                              int64_t tooffset,
                                              const {cpp_from}* fromptr,
                                              int64_t length) {{
    return ragged_numeric_fill(toptr, tooffset, fromptr, length);
  }}"
    )
}

fn dispatch_block(np_from: &str, np_to: &str, cpp_from: &str, cpp_to: &str) -> String {
    format!(
        "template <>
  ERROR numeric_fill<{cpp_from}, {cpp_to}>(
      kernel::lib ptr_lib,
      {cpp_to} *toptr,
      int64_t tooffset,
      const {cpp_from} *fromptr,
      int64_t length) {{
    if (ptr_lib == kernel::lib::cpu) {{
      return ragged_numeric_fill_to{np_to}_from{np_from}(
        toptr,
        tooffset,
        fromptr,
        length);
    }}
    else if (ptr_lib == kernel::lib::cuda) {{
      throw std::runtime_error(
        std::string(\"not implemented: ptr_lib == cuda \"
                    \"for numeric_fill<{cpp_to}, {cpp_from}>\"
                    + FILENAME(__LINE__)));
    }}
    else {{
      throw std::runtime_error(
        std::string(\"unrecognized ptr_lib \"
                    \"for numeric_fill<{cpp_to}, {cpp_from}>\"
                    + FILENAME(__LINE__)));
    }}
  }}"
    )
}

/// One boilerplate block for a `(from, to)` type pair.
pub fn emit_block(category: FillCategory, from: (&str, &str), to: (&str, &str)) -> String {
    let (np_from, cpp_from) = from;
    let (np_to, cpp_to) = to;
    match category {
        FillCategory::Declaration => declaration_block(np_from, np_to, cpp_from, cpp_to),
        FillCategory::Stub => stub_block(np_from, np_to, cpp_from, cpp_to),
        FillCategory::Dispatch => dispatch_block(np_from, np_to, cpp_from, cpp_to),
    }
}

/// The full source-major cross-product for one category: 169 blocks,
/// each followed by a newline.
pub fn emit(category: FillCategory) -> String {
    let mut out = String::new();
    for from in TYPE_CATALOGUE {
        for to in TYPE_CATALOGUE {
            out.push_str(&emit_block(category, from, to));
            out.push('\n');
        }
    }
    out
}

// ── Tests ───────────────────────────────────────────────────────────────────
