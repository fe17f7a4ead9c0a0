// Frame descriptors parsed from demangled symbol names

/// Crates whose frames are plumbing between a caller and its callee
/// (closure shims, async executors) rather than meaningful callers.
const RUNTIME_CRATES: &[&str] = &[
    "core",
    "alloc",
    "std",
    "tokio",
    "futures",
    "futures_util",
    "futures_executor",
    "async_std",
];

/// Module names that carry no meaning as a job name
const GENERIC_MODULES: &[&str] = &["tests", "test", "it", "integration"];

/// One stack frame, reduced to a normalized path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameDescriptor {
    /// Normalized symbol path, e.g. `my_crate::login::tests::valid_credentials`
    pub symbol: String,

    /// Path segments without closure markers or generic arguments
    pub segments: Vec<String>,
}

impl FrameDescriptor {
    /// Parse a demangled symbol name
    ///
    /// Handles hash suffixes, generic arguments, closure markers and
    /// qualified trait paths. `<Type as Trait>::method` keeps `Type` when it
    /// is a path, and `Trait` for fn pointers, trait objects and the like.
    pub fn parse(raw: &str) -> Self {
        let without_hash = strip_hash(raw.trim());
        let unqualified = strip_qualified_self(without_hash);
        let path = strip_generics(&unqualified);

        let segments: Vec<String> = path
            .split("::")
            .map(str::trim)
            .filter(|segment| !segment.is_empty() && !segment.starts_with('{'))
            .map(str::to_string)
            .collect();

        Self {
            symbol: segments.join("::"),
            segments,
        }
    }

    /// Crate the frame belongs to (first path segment)
    pub fn crate_name(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or_default()
    }

    /// Function (or method) name (last path segment)
    pub fn function(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Path segments between the crate and the function
    pub fn modules(&self) -> &[String] {
        if self.segments.len() <= 2 {
            &[]
        } else {
            &self.segments[1..self.segments.len() - 1]
        }
    }

    /// Enclosing module or type, skipping generic test-module names
    ///
    /// Falls back to the crate name for top-level functions.
    pub fn enclosing_name(&self) -> &str {
        self.modules()
            .iter()
            .rev()
            .map(String::as_str)
            .find(|m| !GENERIC_MODULES.contains(m))
            .unwrap_or_else(|| self.crate_name())
    }

    /// Whether this frame belongs to `crate_name`
    pub fn in_crate(&self, crate_name: &str) -> bool {
        self.crate_name() == crate_name
    }

    /// Whether both frames are the same function (closures included)
    pub fn same_function(&self, other: &FrameDescriptor) -> bool {
        self.segments == other.segments
    }

    /// Whether this frame is runtime plumbing (std, core, async executors)
    pub fn is_runtime(&self) -> bool {
        RUNTIME_CRATES.contains(&self.crate_name())
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Remove a trailing `::h0123456789abcdef` legacy mangling hash
fn strip_hash(symbol: &str) -> &str {
    if let Some(idx) = symbol.rfind("::h") {
        let hash = &symbol[idx + 3..];
        if hash.len() == 16 && hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return &symbol[..idx];
        }
    }
    symbol
}

/// Rewrite `<Type as Trait>::rest` into `Type::rest` (or `Trait::rest`)
fn strip_qualified_self(symbol: &str) -> String {
    if !symbol.starts_with('<') {
        return symbol.to_string();
    }

    let mut depth = 0usize;
    let mut prev = None;
    for (idx, ch) in symbol.char_indices() {
        match ch {
            '<' => depth += 1,
            // `->` in fn pointer types is not a bracket
            '>' if prev != Some('-') => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let inner = &symbol[1..idx];
                    let qualifier = match inner.rsplit_once(" as ") {
                        Some((self_type, _)) if is_type_path(self_type.trim_start_matches('&')) => {
                            self_type.trim_start_matches('&')
                        }
                        Some((_, trait_path)) => trait_path,
                        None => inner.trim_start_matches('&'),
                    };
                    return format!("{}{}", qualifier, &symbol[idx + 1..]);
                }
            }
            _ => {}
        }
        prev = Some(ch);
    }
    symbol.to_string()
}

/// Whether a self type is a plain path like `shop::Page<T>`
fn is_type_path(ty: &str) -> bool {
    let head = ty.split('<').next().unwrap_or(ty);
    head.starts_with(|c: char| c.is_alphabetic() || c == '_')
        && head.chars().all(|c| c.is_alphanumeric() || c == '_' || c == ':')
}

/// Drop all `<...>` generic argument lists
fn strip_generics(symbol: &str) -> String {
    let mut depth = 0usize;
    let mut prev = None;
    let mut out = String::with_capacity(symbol.len());
    for ch in symbol.chars() {
        match ch {
            '<' => depth += 1,
            '>' if prev != Some('-') => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
        prev = Some(ch);
    }
    out
}

/// Parse the text rendering of a `std::backtrace::Backtrace`
///
/// Lines look like `  12: my_crate::module::function` followed by an
/// optional `at src/file.rs:10:5` location line. Inlined frames appear as
/// extra unnumbered symbol lines.
pub fn parse_backtrace(rendered: &str) -> Vec<FrameDescriptor> {
    rendered
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("at "))
        .map(|line| match line.split_once(": ") {
            Some((index, symbol)) if index.chars().all(|c| c.is_ascii_digit()) => symbol,
            _ => line,
        })
        .filter(|symbol| !symbol.starts_with("<unknown>"))
        .map(FrameDescriptor::parse)
        .filter(|frame| !frame.is_empty())
        .collect()
}
