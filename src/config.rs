use crate::{
  error::HeapError,
  search::SearchMode,
  tag::BLOCK_UNIT,
};

/// Default number of bytes requested from the segment when the heap runs out
/// of free blocks.
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 10;

/// Default size a trailing free block must reach before it is handed back.
pub const DEFAULT_SHRINK_THRESHOLD: usize = 1 << 10;

/// How chatty the heap is through the [`log`] facade.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticLevel {
  #[default]
  Off,
  /// Every public operation and its arguments.
  Info,
  /// Also searches, splits, merges, growth and shrinking.
  Verbose,
}

impl DiagnosticLevel {
  /// Level the messages of this tier are logged at. `Off` has none.
  pub(crate) fn log_level(self) -> Option<log::Level> {
    match self {
      DiagnosticLevel::Off => None,
      DiagnosticLevel::Info => Some(log::Level::Info),
      DiagnosticLevel::Verbose => Some(log::Level::Debug),
    }
  }
}

impl From<u8> for DiagnosticLevel {
  fn from(level: u8) -> Self {
    match level {
      0 => DiagnosticLevel::Off,
      1 => DiagnosticLevel::Info,
      _ => DiagnosticLevel::Verbose,
    }
  }
}

/// Tunables fixed when a [`crate::Heap`] is initialized.
///
/// ```rust
/// use tagheap::{DiagnosticLevel, HeapConfig, SearchMode};
///
/// let config = HeapConfig::new(SearchMode::BestFit)
///   .with_chunk_size(4096)
///   .with_diagnostics(DiagnosticLevel::Info);
///
/// assert_eq!(config.search_mode, SearchMode::BestFit);
/// assert_eq!(config.chunk_size, 4096);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeapConfig {
  pub search_mode: SearchMode,
  /// Minimum growth of the segment, in bytes.
  pub chunk_size: usize,
  /// A free block at the end of the heap at least this large is returned to
  /// the segment.
  pub shrink_threshold: usize,
  pub diagnostics: DiagnosticLevel,
}

impl HeapConfig {
  pub const fn new(search_mode: SearchMode) -> Self {
    Self {
      search_mode,
      chunk_size: DEFAULT_CHUNK_SIZE,
      shrink_threshold: DEFAULT_SHRINK_THRESHOLD,
      diagnostics: DiagnosticLevel::Off,
    }
  }

  pub const fn with_chunk_size(
    mut self,
    chunk_size: usize,
  ) -> Self {
    self.chunk_size = chunk_size;
    self
  }

  pub const fn with_shrink_threshold(
    mut self,
    shrink_threshold: usize,
  ) -> Self {
    self.shrink_threshold = shrink_threshold;
    self
  }

  pub const fn with_diagnostics(
    mut self,
    diagnostics: DiagnosticLevel,
  ) -> Self {
    self.diagnostics = diagnostics;
    self
  }

  pub(crate) fn validate(&self) -> Result<(), HeapError> {
    if self.chunk_size % BLOCK_UNIT != 0 {
      return Err(HeapError::InvalidConfig("chunk size must be a multiple of the block unit"));
    }
    if self.chunk_size < 4 * BLOCK_UNIT {
      return Err(HeapError::InvalidConfig("chunk size must be at least four block units"));
    }
    if self.shrink_threshold == 0 || self.shrink_threshold % BLOCK_UNIT != 0 {
      return Err(HeapError::InvalidConfig(
        "shrink threshold must be a non-zero multiple of the block unit",
      ));
    }
    Ok(())
  }
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self::new(SearchMode::FirstFit)
  }
}
