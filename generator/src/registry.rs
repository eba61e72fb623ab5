// registry.rs — Kernel specification registry
//
// Loads kernel specification records from a JSON manifest plus per-kernel
// spec files, validates them, and classifies each name against the curated
// eligibility lists. The registry also produces a SHA-256 fingerprint of
// the loaded records for provenance stamping in generated output.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ── Type descriptors ────────────────────────────────────────────────────────

/// A scalar type optionally wrapped in `List[...]` markers.
///
/// The wrapping depth is the pointer depth of the rendered C type; a
/// leading `const` survives into the rendering. Serialized as the plain
/// string form, e.g. `"const List[List[int64_t]]"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TypeDesc {
    pub base: String,
    pub depth: usize,
    pub is_const: bool,
}

impl TypeDesc {
    pub fn parse(s: &str) -> Self {
        let mut rest = s.trim();
        let is_const = if let Some(r) = rest.strip_prefix("const ") {
            rest = r.trim_start();
            true
        } else {
            false
        };
        let mut depth = 0;
        while let Some(inner) = rest
            .strip_prefix("List[")
            .and_then(|r| r.strip_suffix(']'))
        {
            rest = inner;
            depth += 1;
        }
        TypeDesc {
            base: rest.to_string(),
            depth,
            is_const,
        }
    }

    /// Render to a C type: `[const ]base` followed by one `*` per level.
    pub fn ctype(&self) -> String {
        let mut out = String::new();
        if self.is_const {
            out.push_str("const ");
        }
        out.push_str(&self.base);
        for _ in 0..self.depth {
            out.push('*');
        }
        out
    }

    /// Same descriptor with the base swapped for a template letter.
    pub fn with_base(&self, base: &str) -> Self {
        TypeDesc {
            base: base.to_string(),
            depth: self.depth,
            is_const: self.is_const,
        }
    }
}

impl From<String> for TypeDesc {
    fn from(s: String) -> Self {
        TypeDesc::parse(&s)
    }
}

impl From<TypeDesc> for String {
    fn from(t: TypeDesc) -> Self {
        format!("{t}")
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_const {
            write!(f, "const ")?;
        }
        for _ in 0..self.depth {
            write!(f, "List[")?;
        }
        write!(f, "{}", self.base)?;
        for _ in 0..self.depth {
            write!(f, "]")?;
        }
        Ok(())
    }
}

// ── Specification records ───────────────────────────────────────────────────

/// One named, typed argument of a kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelArg {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDesc,
}

/// A per-type specialization of a parent kernel. Shares the parent's
/// definition body; carries its own concrete argument types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specialization {
    pub name: String,
    pub args: Vec<KernelArg>,
}

/// A complete kernel specification record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelSpec {
    pub name: String,
    pub args: Vec<KernelArg>,
    #[serde(default)]
    pub outparams: Vec<String>,
    pub definition: String,
    #[serde(default)]
    pub specializations: Vec<Specialization>,
}

impl KernelSpec {
    pub fn arg_names(&self) -> Vec<&str> {
        self.args.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn is_outparam(&self, name: &str) -> bool {
        self.outparams.iter().any(|o| o == name)
    }
}

/// Device-side symbol name for a kernel or specialization name.
///
/// `ragged_regular_num` → `cuda_regular_num`.
pub fn device_name(name: &str) -> String {
    match name.strip_prefix("ragged") {
        Some(rest) => format!("cuda{rest}"),
        None => format!("cuda_{name}"),
    }
}

// ── Classification ──────────────────────────────────────────────────────────

/// Curated generation status of a kernel name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Transpiles cleanly; generated.
    Eligible,
    /// Known and reviewed; generation deliberately deferred.
    ReviewedPending,
    /// Explicitly unsupported.
    Excluded,
}

impl Classification {
    pub fn label(self) -> &'static str {
        match self {
            Classification::Eligible => "eligible",
            Classification::ReviewedPending => "reviewed-pending",
            Classification::Excluded => "excluded",
        }
    }
}

/// Kernels that generate. Curated by hand; a name moves here only after its
/// generated output has been inspected.
pub const ELIGIBLE: &[&str] = &[
    "ragged_carry_arange",
    "ragged_content_reduce_zeroparents",
    "ragged_index8_to_index64",
    "ragged_list_min_range",
    "ragged_new_identities",
    "ragged_regular_num",
    "ragged_union_fillna",
    "ragged_zero_mask",
];

/// Kernels reviewed but intentionally not yet generated.
pub const REVIEWED_PENDING: &[&str] = &["ragged_reduce_count", "ragged_sorting_ranges"];

/// Kernels that will not be generated (shape outside the sublanguage).
pub const EXCLUDED: &[&str] = &["ragged_string_repeat", "ragged_varargs_concat"];

/// Classify a kernel name against the curated lists.
pub fn classify(name: &str) -> Option<Classification> {
    if ELIGIBLE.contains(&name) {
        Some(Classification::Eligible)
    } else if REVIEWED_PENDING.contains(&name) {
        Some(Classification::ReviewedPending)
    } else if EXCLUDED.contains(&name) {
        Some(Classification::Excluded)
    } else {
        None
    }
}

// ── Load errors ─────────────────────────────────────────────────────────────

/// Errors that can occur during registry loading.
#[derive(Debug)]
pub enum RegistryError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    DuplicateKernel {
        name: String,
    },
    ArgCountMismatch {
        kernel: String,
        child: String,
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Io { path, source } => {
                write!(f, "{}: {}", path.display(), source)
            }
            RegistryError::Json { path, source } => {
                write!(f, "{}: {}", path.display(), source)
            }
            RegistryError::DuplicateKernel { name } => {
                write!(f, "duplicate kernel '{name}' in manifest")
            }
            RegistryError::ArgCountMismatch {
                kernel,
                child,
                expected,
                found,
            } => {
                write!(
                    f,
                    "kernel '{kernel}': specialization '{child}' has {found} args, expected {expected}"
                )
            }
        }
    }
}

impl std::error::Error for RegistryError {}

// ── Manifest ────────────────────────────────────────────────────────────────

/// Manifest file: spec file paths grouped by category, relative to the
/// manifest's directory. Groups iterate in name order (BTreeMap).
#[derive(Debug, Deserialize)]
pub struct Manifest {
    pub kernels: BTreeMap<String, Vec<String>>,
}

// ── Registry ────────────────────────────────────────────────────────────────

/// Loaded kernel specifications, in registry iteration order: groups by
/// name, files in listed order.
#[derive(Debug)]
pub struct Registry {
    specs: Vec<KernelSpec>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Build a registry from in-memory specs. Validates uniqueness and
    /// specialization argument counts.
    pub fn from_specs(specs: Vec<KernelSpec>) -> Result<Self, RegistryError> {
        let mut index = HashMap::new();
        for (i, spec) in specs.iter().enumerate() {
            if index.insert(spec.name.clone(), i).is_some() {
                return Err(RegistryError::DuplicateKernel {
                    name: spec.name.clone(),
                });
            }
            let expected = spec.args.len();
            for child in &spec.specializations {
                if child.args.len() != expected {
                    return Err(RegistryError::ArgCountMismatch {
                        kernel: spec.name.clone(),
                        child: child.name.clone(),
                        expected,
                        found: child.args.len(),
                    });
                }
            }
        }
        Ok(Registry { specs, index })
    }

    /// Load a registry from a manifest file.
    pub fn load_manifest(path: &Path) -> Result<Self, RegistryError> {
        let text = std::fs::read_to_string(path).map_err(|e| RegistryError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let manifest: Manifest =
            serde_json::from_str(&text).map_err(|e| RegistryError::Json {
                path: path.to_path_buf(),
                source: e,
            })?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));

        let mut specs = Vec::new();
        for files in manifest.kernels.values() {
            for rel in files {
                let spec_path = dir.join(rel);
                let text =
                    std::fs::read_to_string(&spec_path).map_err(|e| RegistryError::Io {
                        path: spec_path.clone(),
                        source: e,
                    })?;
                let spec: KernelSpec =
                    serde_json::from_str(&text).map_err(|e| RegistryError::Json {
                        path: spec_path.clone(),
                        source: e,
                    })?;
                specs.push(spec);
            }
        }
        Registry::from_specs(specs)
    }

    pub fn get(&self, name: &str) -> Option<&KernelSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    /// All specs, in registry iteration order.
    pub fn iter(&self) -> impl Iterator<Item = &KernelSpec> {
        self.specs.iter()
    }

    /// Specs classified eligible, in registry iteration order.
    pub fn eligible(&self) -> impl Iterator<Item = &KernelSpec> {
        self.specs
            .iter()
            .filter(|s| classify(&s.name) == Some(Classification::Eligible))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Compact canonical JSON of the loaded records, in iteration order.
    pub fn canonical_json(&self) -> String {
        // Vec<KernelSpec> serialization cannot fail.
        serde_json::to_string(&self.specs).unwrap_or_default()
    }

    /// Hex SHA-256 of the canonical JSON. Stamped into generated output.
    pub fn fingerprint(&self) -> String {
        use std::fmt::Write;
        let digest = Sha256::digest(self.canonical_json().as_bytes());
        let mut out = String::with_capacity(64);
        for byte in digest {
            // String formatting is infallible.
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str) -> KernelSpec {
        KernelSpec {
            name: name.to_string(),
            args: vec![
                KernelArg {
                    name: "out".to_string(),
                    ty: TypeDesc::parse("List[int64_t]"),
                },
                KernelArg {
                    name: "length".to_string(),
                    ty: TypeDesc::parse("int64_t"),
                },
            ],
            outparams: vec!["out".to_string()],
            definition: "def f(out, length):\n    for i in range(length):\n        out[i] = i\n"
                .to_string(),
            specializations: Vec::new(),
        }
    }

    #[test]
    fn typedesc_scalar() {
        let t = TypeDesc::parse("int64_t");
        assert_eq!(t.base, "int64_t");
        assert_eq!(t.depth, 0);
        assert!(!t.is_const);
        assert_eq!(t.ctype(), "int64_t");
    }

    #[test]
    fn typedesc_const_nested_list() {
        let t = TypeDesc::parse("const List[List[uint32_t]]");
        assert_eq!(t.base, "uint32_t");
        assert_eq!(t.depth, 2);
        assert!(t.is_const);
        assert_eq!(t.ctype(), "const uint32_t**");
    }

    #[test]
    fn typedesc_roundtrip() {
        for s in ["bool", "List[float]", "const List[List[int8_t]]"] {
            let t = TypeDesc::parse(s);
            assert_eq!(format!("{t}"), s);
        }
    }

    #[test]
    fn typedesc_with_base() {
        let t = TypeDesc::parse("const List[double]").with_base("A");
        assert_eq!(t.ctype(), "const A*");
    }

    #[test]
    fn device_name_strips_prefix() {
        assert_eq!(device_name("ragged_regular_num"), "cuda_regular_num");
        assert_eq!(
            device_name("ragged_regular_num_int64"),
            "cuda_regular_num_int64"
        );
    }

    #[test]
    fn classification_lists_are_disjoint() {
        for name in ELIGIBLE {
            assert!(!REVIEWED_PENDING.contains(name));
            assert!(!EXCLUDED.contains(name));
        }
        for name in REVIEWED_PENDING {
            assert!(!EXCLUDED.contains(name));
        }
    }

    #[test]
    fn classify_known_names() {
        assert_eq!(
            classify("ragged_regular_num"),
            Some(Classification::Eligible)
        );
        assert_eq!(
            classify("ragged_reduce_count"),
            Some(Classification::ReviewedPending)
        );
        assert_eq!(
            classify("ragged_varargs_concat"),
            Some(Classification::Excluded)
        );
        assert_eq!(classify("ragged_no_such_kernel"), None);
    }

    #[test]
    fn duplicate_kernel_error() {
        let err = Registry::from_specs(vec![spec("ragged_regular_num"), spec("ragged_regular_num")])
            .unwrap_err();
        match err {
            RegistryError::DuplicateKernel { name } => assert_eq!(name, "ragged_regular_num"),
            other => panic!("expected DuplicateKernel, got: {other}"),
        }
    }

    #[test]
    fn arg_count_mismatch_error() {
        let mut s = spec("ragged_regular_num");
        s.specializations.push(Specialization {
            name: "ragged_regular_num_int64".to_string(),
            args: vec![KernelArg {
                name: "out".to_string(),
                ty: TypeDesc::parse("List[int64_t]"),
            }],
        });
        let err = Registry::from_specs(vec![s]).unwrap_err();
        match err {
            RegistryError::ArgCountMismatch {
                expected, found, ..
            } => {
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("expected ArgCountMismatch, got: {other}"),
        }
    }

    #[test]
    fn spec_json_roundtrip() {
        let s = spec("ragged_zero_mask");
        let json = serde_json::to_string(&s).unwrap();
        let back: KernelSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn spec_json_defaults() {
        let json = r#"{
            "name": "ragged_zero_mask",
            "args": [{"name": "mask", "type": "List[int8_t]"}],
            "definition": "def f(mask):\n    mask[0] = 0\n"
        }"#;
        let s: KernelSpec = serde_json::from_str(json).unwrap();
        assert!(s.outparams.is_empty());
        assert!(s.specializations.is_empty());
        assert_eq!(s.args[0].ty.ctype(), "int8_t*");
    }

    #[test]
    fn fingerprint_is_stable_and_hex() {
        let r1 = Registry::from_specs(vec![spec("ragged_regular_num")]).unwrap();
        let r2 = Registry::from_specs(vec![spec("ragged_regular_num")]).unwrap();
        let f = r1.fingerprint();
        assert_eq!(f, r2.fingerprint());
        assert_eq!(f.len(), 64);
        assert!(f.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn fingerprint_tracks_content() {
        let r1 = Registry::from_specs(vec![spec("ragged_regular_num")]).unwrap();
        let r2 = Registry::from_specs(vec![spec("ragged_zero_mask")]).unwrap();
        assert_ne!(r1.fingerprint(), r2.fingerprint());
    }

    #[test]
    fn manifest_loads_groups_in_name_order() {
        let dir = std::env::temp_dir().join("rkc_test_manifest");
        std::fs::create_dir_all(dir.join("operations")).unwrap();
        std::fs::create_dir_all(dir.join("indexing")).unwrap();

        let a = spec("ragged_regular_num");
        let b = spec("ragged_index8_to_index64");
        std::fs::write(
            dir.join("operations/ragged_regular_num.json"),
            serde_json::to_string(&a).unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.join("indexing/ragged_index8_to_index64.json"),
            serde_json::to_string(&b).unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.join("manifest.json"),
            r#"{"kernels": {
                "operations": ["operations/ragged_regular_num.json"],
                "indexing": ["indexing/ragged_index8_to_index64.json"]
            }}"#,
        )
        .unwrap();

        let reg = Registry::load_manifest(&dir.join("manifest.json")).unwrap();
        let names: Vec<&str> = reg.iter().map(|s| s.name.as_str()).collect();
        // "indexing" sorts before "operations".
        assert_eq!(names, vec!["ragged_index8_to_index64", "ragged_regular_num"]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_spec_file_is_io_error() {
        let dir = std::env::temp_dir().join("rkc_test_missing");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("manifest.json"),
            r#"{"kernels": {"operations": ["operations/nope.json"]}}"#,
        )
        .unwrap();

        let err = Registry::load_manifest(&dir.join("manifest.json")).unwrap_err();
        assert!(matches!(err, RegistryError::Io { .. }));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn eligible_filters_by_classification() {
        let reg = Registry::from_specs(vec![
            spec("ragged_regular_num"),
            spec("ragged_reduce_count"),
        ])
        .unwrap();
        let names: Vec<&str> = reg.eligible().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["ragged_regular_num"]);
    }
}
