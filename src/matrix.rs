//! Dense grid of raw pixel codes.
//!
//! # Memory Layout
//!
//! Codes are stored in a flat buffer in row-major order:
//!
//! ```text
//! data[row * cols + col]
//! ```
//!
//! Row 0 is the top of the image. The codec is responsible for mapping the
//! bottom-up on-disk row order onto this.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::slice;

use crate::bit_depth::{BitDepth, PixelCode};

/// Allocation strategy for matrix storage.
///
/// The default uses huge pages on macOS/Linux and standard pages elsewhere.
/// `HugePages` is best-effort: it falls back to a `Vec` if the OS cannot
/// satisfy the request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Allocation {
    Standard,
    HugePages,
}

impl Default for Allocation {
    fn default() -> Self {
        if cfg!(any(target_os = "macos", target_os = "linux")) {
            Allocation::HugePages
        } else {
            Allocation::Standard
        }
    }
}

enum CodeBuffer {
    Vec(Vec<PixelCode>),
    Mmap {
        ptr: NonNull<PixelCode>,
        len: usize,
        bytes: usize,
    },
}

impl CodeBuffer {
    fn filled(len: usize, fill: PixelCode, allocation: Allocation) -> Self {
        if len == 0 {
            return CodeBuffer::Vec(Vec::new());
        }
        let mut buffer = match allocation {
            Allocation::Standard => return CodeBuffer::Vec(vec![fill; len]),
            Allocation::HugePages => {
                mmap_huge_pages(len).unwrap_or_else(|| CodeBuffer::Vec(vec![0; len]))
            }
        };
        // Anonymous mappings come back zeroed.
        if fill != 0 {
            buffer.fill(fill);
        }
        buffer
    }

    fn as_slice(&self) -> &[PixelCode] {
        match self {
            CodeBuffer::Vec(data) => data.as_slice(),
            // SAFETY: `ptr` points to a live mapping of at least `len` codes.
            CodeBuffer::Mmap { ptr, len, .. } => unsafe {
                slice::from_raw_parts(ptr.as_ptr(), *len)
            },
        }
    }

    fn as_mut_slice(&mut self) -> &mut [PixelCode] {
        match self {
            CodeBuffer::Vec(data) => data.as_mut_slice(),
            // SAFETY: the mapping is exclusively owned by this buffer.
            CodeBuffer::Mmap { ptr, len, .. } => unsafe {
                slice::from_raw_parts_mut(ptr.as_ptr(), *len)
            },
        }
    }
}

impl Deref for CodeBuffer {
    type Target = [PixelCode];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl DerefMut for CodeBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl Drop for CodeBuffer {
    fn drop(&mut self) {
        if let CodeBuffer::Mmap { ptr, bytes, .. } = self {
            #[cfg(any(target_os = "macos", target_os = "linux"))]
            unsafe {
                libc::munmap(ptr.as_ptr() as *mut libc::c_void, *bytes);
            }
        }
    }
}

#[cfg(any(target_os = "macos", target_os = "linux"))]
const HUGE_PAGE_MIN_BYTES: usize = 2 * 1024 * 1024;

#[cfg(target_os = "macos")]
const VM_FLAGS_SUPERPAGE_SIZE_2MB: libc::c_int = 0x00020000;

#[cfg(any(target_os = "macos", target_os = "linux"))]
fn mmap_huge_pages(len: usize) -> Option<CodeBuffer> {
    let byte_len = len.checked_mul(std::mem::size_of::<PixelCode>())?;
    if byte_len < HUGE_PAGE_MIN_BYTES {
        return None;
    }

    #[cfg(target_os = "linux")]
    let (alignment, flags, fd) = {
        let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        let page = if page > 0 { page as usize } else { 4096 };
        (page, libc::MAP_PRIVATE | libc::MAP_ANONYMOUS, -1)
    };
    #[cfg(target_os = "macos")]
    let (alignment, flags, fd) = (
        HUGE_PAGE_MIN_BYTES,
        libc::MAP_PRIVATE | libc::MAP_ANON,
        VM_FLAGS_SUPERPAGE_SIZE_2MB,
    );

    let alloc_bytes = byte_len.checked_next_multiple_of(alignment)?;
    let map_ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            alloc_bytes,
            libc::PROT_READ | libc::PROT_WRITE,
            flags,
            fd,
            0,
        )
    };
    if map_ptr == libc::MAP_FAILED {
        return None;
    }
    #[cfg(target_os = "linux")]
    unsafe {
        libc::madvise(map_ptr, alloc_bytes, libc::MADV_HUGEPAGE);
    }
    let Some(ptr) = NonNull::new(map_ptr as *mut PixelCode) else {
        unsafe {
            libc::munmap(map_ptr, alloc_bytes);
        }
        return None;
    };
    Some(CodeBuffer::Mmap {
        ptr,
        len,
        bytes: alloc_bytes,
    })
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn mmap_huge_pages(_len: usize) -> Option<CodeBuffer> {
    None
}

/// A `rows × cols` grid of pixel codes.
///
/// The row index runs down the image, the column index across it. Storage is
/// owned exclusively by the matrix and released when it is dropped.
pub struct PixelMatrix {
    rows: usize,
    cols: usize,
    allocation: Allocation,
    data: CodeBuffer,
}

impl PixelMatrix {
    /// Creates a matrix with every code set to `fill`.
    pub fn new(rows: usize, cols: usize, fill: PixelCode) -> Self {
        Self::with_allocation(rows, cols, fill, Allocation::default())
    }

    pub fn with_allocation(
        rows: usize,
        cols: usize,
        fill: PixelCode,
        allocation: Allocation,
    ) -> Self {
        let len = rows.saturating_mul(cols);
        Self {
            rows,
            cols,
            allocation,
            data: CodeBuffer::filled(len, fill, allocation),
        }
    }

    /// Builds a matrix from nested rows. Panics if the rows are ragged.
    pub fn from_rows<R: AsRef<[PixelCode]>>(rows: &[R]) -> Self {
        let cols = rows.first().map_or(0, |row| row.as_ref().len());
        let mut matrix = Self::with_allocation(rows.len(), cols, 0, Allocation::Standard);
        for (r, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            assert_eq!(row.len(), cols, "row {r} has {} columns, expected {cols}", row.len());
            matrix.row_mut(r).copy_from_slice(row);
        }
        matrix
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn allocation(&self) -> Allocation {
        self.allocation
    }

    /// Returns the code at `(row, col)`. Panics when out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> PixelCode {
        self.check_bounds(row, col);
        self.data[row * self.cols + col]
    }

    /// Stores `value` at `(row, col)`. Panics when out of bounds.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: PixelCode) {
        self.check_bounds(row, col);
        self.data[row * self.cols + col] = value;
    }

    /// Returns the code at `(row, col)`, or `fallback` when either index lies
    /// outside the matrix. Accepts negative indices.
    #[inline]
    pub fn get_or_default(&self, row: isize, col: isize, fallback: PixelCode) -> PixelCode {
        if row < 0 || col < 0 || row as usize >= self.rows || col as usize >= self.cols {
            return fallback;
        }
        self.data[row as usize * self.cols + col as usize]
    }

    pub fn row(&self, row: usize) -> &[PixelCode] {
        let start = row * self.cols;
        &self.data[start..start + self.cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [PixelCode] {
        let start = row * self.cols;
        &mut self.data[start..start + self.cols]
    }

    pub fn as_slice(&self) -> &[PixelCode] {
        &self.data
    }

    /// Flips every valid bit of every code at `depth`.
    pub fn invert(&mut self, depth: BitDepth) {
        let mask = depth.code_mask();
        for code in self.data.iter_mut() {
            *code = !*code & mask;
        }
    }

    fn check_bounds(&self, row: usize, col: usize) {
        assert!(
            row < self.rows && col < self.cols,
            "pixel ({row}, {col}) out of bounds for {}x{} matrix",
            self.rows,
            self.cols
        );
    }
}

impl Clone for PixelMatrix {
    fn clone(&self) -> Self {
        let mut cloned = Self::with_allocation(self.rows, self.cols, 0, self.allocation);
        cloned.data.copy_from_slice(&self.data);
        cloned
    }
}

impl PartialEq for PixelMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows && self.cols == other.cols && self.as_slice() == other.as_slice()
    }
}

impl Eq for PixelMatrix {}

impl fmt::Debug for PixelMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for r in 0..self.rows {
            list.entry(&self.row(r));
        }
        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_filled() {
        let m = PixelMatrix::new(3, 4, 7);
        assert_eq!(m.rows(), 3);
        assert_eq!(m.cols(), 4);
        assert!(m.as_slice().iter().all(|&c| c == 7));
    }

    #[test]
    fn test_get_set_row_major() {
        let mut m = PixelMatrix::new(2, 3, 0);
        m.set(1, 2, 42);
        assert_eq!(m.get(1, 2), 42);
        assert_eq!(m.as_slice()[5], 42);
        assert_eq!(m.row(1), &[0, 0, 42]);
    }

    #[test]
    #[should_panic]
    fn test_get_out_of_bounds_panics() {
        let m = PixelMatrix::new(2, 2, 0);
        let _ = m.get(2, 0);
    }

    #[test]
    #[should_panic]
    fn test_set_out_of_bounds_panics() {
        let mut m = PixelMatrix::new(2, 2, 0);
        m.set(0, 2, 1);
    }

    #[test]
    fn test_get_or_default() {
        let m = PixelMatrix::from_rows(&[[1u32, 2], [3, 4]]);
        assert_eq!(m.get_or_default(1, 1, 9), 4);
        assert_eq!(m.get_or_default(-1, 0, 9), 9);
        assert_eq!(m.get_or_default(0, -1, 9), 9);
        assert_eq!(m.get_or_default(2, 0, 9), 9);
        assert_eq!(m.get_or_default(0, 2, 9), 9);
    }

    #[test]
    fn test_clone_is_deep_copy() {
        let mut m = PixelMatrix::from_rows(&[[1u32, 2, 3]]);
        let cloned = m.clone();
        m.set(0, 0, 100);
        assert_eq!(cloned.get(0, 0), 1);
        assert_ne!(cloned, m);
    }

    #[test]
    fn test_invert_masks_to_depth() {
        let mut m = PixelMatrix::from_rows(&[[0u32, 1], [0xF, 0x5]]);
        m.invert(BitDepth::Four);
        assert_eq!(m, PixelMatrix::from_rows(&[[0xFu32, 0xE], [0, 0xA]]));

        let mut m = PixelMatrix::from_rows(&[[0x00_FF_00_FFu32]]);
        m.invert(BitDepth::ThirtyTwo);
        assert_eq!(m.get(0, 0), 0xFF_00_FF_00);
    }

    #[test]
    fn test_huge_page_fill_matches_standard() {
        let a = PixelMatrix::with_allocation(1024, 1024, 3, Allocation::HugePages);
        let b = PixelMatrix::with_allocation(1024, 1024, 3, Allocation::Standard);
        assert_eq!(a, b);
    }
}
