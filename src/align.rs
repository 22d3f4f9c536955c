/// Rounds `value` up to the next multiple of `unit`, which must be a power of
/// two.
///
/// # Examples
///
/// ```rust
/// use tagheap::align_up;
///
/// assert_eq!(align_up!(13, 8), 16);
/// assert_eq!(align_up!(32, 32), 32);
/// assert_eq!(align_up!(33, 32), 64);
/// ```
#[macro_export]
macro_rules! align_up {
  ($value:expr, $unit:expr) => {
    ($value + $unit - 1) & !($unit - 1)
  };
}

/// Rounds `value` down to a multiple of `unit`, which must be a power of two.
///
/// ```rust
/// use tagheap::align_down;
///
/// assert_eq!(align_down!(63, 32), 32);
/// assert_eq!(align_down!(4096, 4096), 4096);
/// ```
#[macro_export]
macro_rules! align_down {
  ($value:expr, $unit:expr) => {
    $value & !($unit - 1)
  };
}
