//! Construction-time options for documents, parsers and encoders.

use bitflags::bitflags;

use crate::dom::SharedDictionary;

/// Storage strategy behind a [`crate::Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Mutable arena-backed tree.
    #[default]
    InMemory,
    /// Read-only view over an OSON image.
    Binary,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::InMemory => "in-memory",
            BackendKind::Binary => "binary",
        }
    }
}

bitflags! {
    /// Behavior switches fixed when a document is created.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DomFlags: u32 {
        /// `reset` releases arena memory instead of keeping it for reuse.
        const RECYCLE_ALL = 0x0001;
        /// Encoded images keep object fields in insertion order.
        const NO_SORT_FIELD_IDS = 0x0002;
        /// Number items are kept as their decimal text (the default policy).
        const NUM_AS_STRING = 0x0004;
        /// Number items become `Int64`/`UInt64`/`Double` when they fit.
        const NUM_AS_NATIVE = 0x0008;
        /// Number items become Oracle NUMBER images when they fit.
        const NUM_AS_ORACLE = 0x0010;
        /// Freed slots are never reused.
        const NO_FREE_LIST = 0x0020;
        /// Every attach runs a full reachability check.
        const CHECK_LINKS = 0x0040;
        /// Encoded images use the streaming (pre-order, inline) layout.
        const STREAM_ENCODED = 0x0080;
        /// Partial updates may only overwrite records in place.
        const PARTIAL_UPDATE_REPLACE_ONLY = 0x0100;
        /// Freed nodes stay allocated and are marked dead.
        const PRESERVE_NODES = 0x0200;
        /// Binary images are structurally validated when loaded.
        const VALIDATE = 0x0400;
        /// Validation also checks that every string is well-formed UTF-8.
        const VALIDATE_STRINGS = 0x0800;
        /// Validation rejects images whose root is a scalar.
        const DISALLOW_SCALARS = 0x1000;
        /// A node may be attached under more than one container.
        const MULTI_PARENT = 0x2000;
        /// Only construction is allowed: no delete, unlink, rename or replace.
        const CONSTRUCTOR_ONLY = 0x4000;
        /// Binary images are copied instead of shared with the caller.
        const COPY_INPUT = 0x8000;
    }
}

/// How textual numbers are materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberEncoding {
    #[default]
    Text,
    Native,
    Oracle,
}

/// Options for [`crate::Document::new`].
#[derive(Debug, Clone, Default)]
pub struct DomOptions {
    pub backend: BackendKind,
    pub flags: DomFlags,
    /// When set, field ids are scoped to this dictionary instead of the document.
    pub dictionary: Option<SharedDictionary>,
}

impl DomOptions {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn binary() -> Self {
        Self {
            backend: BackendKind::Binary,
            ..Self::default()
        }
    }

    pub fn with_flags(mut self, flags: DomFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_dictionary(mut self, dictionary: SharedDictionary) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    pub fn has(&self, flag: DomFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Oracle wins over native when both are requested.
    pub fn number_encoding(&self) -> NumberEncoding {
        if self.has(DomFlags::NUM_AS_ORACLE) {
            NumberEncoding::Oracle
        } else if self.has(DomFlags::NUM_AS_NATIVE) {
            NumberEncoding::Native
        } else {
            NumberEncoding::Text
        }
    }

    /// Encoder settings implied by these document flags.
    pub fn encode_options(&self) -> crate::oson::EncodeOptions {
        crate::oson::EncodeOptions {
            sort_field_ids: !self.has(DomFlags::NO_SORT_FIELD_IDS),
            streaming: self.has(DomFlags::STREAM_ENCODED),
            dictionary: self.dictionary.clone(),
            numbers: self.number_encoding(),
        }
    }
}

bitflags! {
    /// Relaxations of strict JSON accepted by the text event source.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ParseFlags: u32 {
        const UNQUOTED_NAMES = 0x0001;
        const SINGLE_QUOTES = 0x0002;
        const TRAILING_COMMAS = 0x0004;
        const SCALAR_DOCUMENTS = 0x0008;
        const LEADING_BOM = 0x0010;
        const MIXEDCASE_KEYWORDS = 0x0020;
        const DISALLOW_DUPLICATES = 0x0040;
    }
}

impl Default for ParseFlags {
    fn default() -> Self {
        ParseFlags::SCALAR_DOCUMENTS
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub flags: ParseFlags,
    pub numbers: NumberEncoding,
    /// Check well-formedness only; string and key payloads come back empty.
    pub validate_only: bool,
}

impl ParseOptions {
    /// Every relaxation enabled.
    pub fn lax() -> Self {
        Self {
            flags: ParseFlags::all() - ParseFlags::DISALLOW_DUPLICATES,
            ..Self::default()
        }
    }

    pub fn with_flags(mut self, flags: ParseFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn without_flags(mut self, flags: ParseFlags) -> Self {
        self.flags -= flags;
        self
    }

    pub fn with_numbers(mut self, numbers: NumberEncoding) -> Self {
        self.numbers = numbers;
        self
    }
}

bitflags! {
    /// Text output switches for [`crate::print::PrintContext`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PrintFlags: u32 {
        /// Newlines and two-space indentation.
        const PRETTY = 0x0001;
        /// Non-ASCII characters are written as `\u` escapes.
        const ASCII = 0x0002;
        /// Numbers are rewritten in canonical, non-exponential form where possible.
        const NUMFORMAT = 0x0004;
    }
}

/// Order in which object members are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Encounter order.
    #[default]
    None,
    /// Byte order of the key names.
    KeyName,
    /// Shorter names first, ties broken by byte order.
    Optimize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PrintOptions {
    pub flags: PrintFlags,
    pub sort: SortMode,
}

impl PrintOptions {
    pub fn pretty() -> Self {
        Self {
            flags: PrintFlags::PRETTY,
            ..Self::default()
        }
    }

    pub fn with_flags(mut self, flags: PrintFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    pub fn has(&self, flag: PrintFlags) -> bool {
        self.flags.contains(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oracle_number_policy_wins() {
        let opts = DomOptions::in_memory()
            .with_flags(DomFlags::NUM_AS_NATIVE | DomFlags::NUM_AS_ORACLE);
        assert_eq!(opts.number_encoding(), NumberEncoding::Oracle);
        assert_eq!(DomOptions::default().number_encoding(), NumberEncoding::Text);
    }

    #[test]
    fn encode_options_follow_flags() {
        let opts = DomOptions::binary()
            .with_flags(DomFlags::NO_SORT_FIELD_IDS | DomFlags::STREAM_ENCODED);
        let enc = opts.encode_options();
        assert!(!enc.sort_field_ids);
        assert!(enc.streaming);
    }

    #[test]
    fn default_parse_flags_accept_scalars_only() {
        let opts = ParseOptions::default();
        assert_eq!(opts.flags, ParseFlags::SCALAR_DOCUMENTS);
        assert!(ParseOptions::lax().flags.contains(ParseFlags::TRAILING_COMMAS));
        assert!(!ParseOptions::lax()
            .flags
            .contains(ParseFlags::DISALLOW_DUPLICATES));
    }
}
