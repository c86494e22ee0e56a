use super::errors::AllocError;
use std::alloc::{alloc, dealloc, Layout};
use std::mem::ManuallyDrop;
use std::ptr::NonNull;

/// A block of memory obtained from the system allocator, aligned to its own
/// size. Pools live in blocks; the alignment is what lets a slot address be
/// masked back to the address of its pool.
pub struct Block {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl Block {
    pub fn new(log_size: u32) -> Result<Block, AllocError> {
        let size = 1usize << log_size;
        let layout = Layout::from_size_align(size, size).map_err(|_| AllocError::OOM)?;

        Ok(Block {
            ptr: Self::alloc_block(layout)?,
            layout,
        })
    }

    #[cfg(test)]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    #[cfg(test)]
    pub fn get_size(&self) -> usize {
        self.layout.size()
    }

    /// Gives up ownership of the memory. It must be handed back with
    /// [`Block::from_raw`] to be released.
    pub fn into_raw(self) -> NonNull<u8> {
        ManuallyDrop::new(self).ptr
    }

    /// # Safety
    /// `ptr` must come from [`Block::into_raw`] on a block of `log_size`.
    pub unsafe fn from_raw(ptr: NonNull<u8>, log_size: u32) -> Block {
        let size = 1usize << log_size;

        Block {
            ptr,
            layout: Layout::from_size_align_unchecked(size, size),
        }
    }

    fn alloc_block(layout: Layout) -> Result<NonNull<u8>, AllocError> {
        unsafe {
            let ptr = alloc(layout);

            if ptr.is_null() {
                Err(AllocError::OOM)
            } else {
                Ok(NonNull::new_unchecked(ptr))
            }
        }
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_are_aligned_to_their_size() {
        for log_size in 9..16 {
            let block = Block::new(log_size).unwrap();

            assert_eq!(block.get_size(), 1 << log_size);
            assert_eq!(block.as_ptr() as usize % block.get_size(), 0);
        }
    }

    #[test]
    fn raw_round_trip_keeps_address() {
        let block = Block::new(12).unwrap();
        let addr = block.as_ptr() as usize;
        let raw = block.into_raw();
        let block = unsafe { Block::from_raw(raw, 12) };

        assert_eq!(block.as_ptr() as usize, addr);
    }
}
