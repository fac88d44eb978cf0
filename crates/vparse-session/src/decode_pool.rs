//! Separate decode/display surface pool (§4.6 component table, row
//! `DecodePool`). A surface is reusable only when neither the decoder nor
//! the display consumer is holding it.

use crate::error::{ParserError, Result};

#[derive(Debug, Clone, Copy)]
pub struct DecodeSurface {
    pub surface_idx: u8,
    pub dec_use_flag: bool,
    pub disp_use_flag: bool,
    pub order_key: i32,
}

impl DecodeSurface {
    fn new(surface_idx: u8) -> Self {
        Self { surface_idx, dec_use_flag: false, disp_use_flag: false, order_key: 0 }
    }

    /// I4: a surface with `disp_use_flag` set is never chosen as free.
    fn is_free(&self) -> bool {
        !self.dec_use_flag && !self.disp_use_flag
    }
}

/// Sized `dpb.size + max_display_delay` per §10.2's HEVC DPB-size
/// resolution, generalized to all three codecs.
#[derive(Debug, Clone)]
pub struct DecodePool {
    surfaces: Vec<DecodeSurface>,
}

impl DecodePool {
    pub fn new(len: usize) -> Self {
        Self { surfaces: (0..len).map(|i| DecodeSurface::new(i as u8)).collect() }
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Acquire a free surface for the current picture's decode, marking it
    /// in-use on both sides it will need (dec now, disp once bumped).
    pub fn acquire(&mut self, order_key: i32) -> Result<u8> {
        let surface = self
            .surfaces
            .iter_mut()
            .find(|s| s.is_free())
            .ok_or_else(|| ParserError::DpbOverflow("no free decode surface".to_string()))?;
        surface.dec_use_flag = true;
        surface.order_key = order_key;
        Ok(surface.surface_idx)
    }

    /// Cleared when the slot leaves the DPB (modeled here as immediately
    /// after the decode callback consumes it, matching the DpbSlot
    /// lifecycle note in §3).
    pub fn release_decode(&mut self, surface_idx: u8) {
        if let Some(s) = self.surfaces.get_mut(surface_idx as usize) {
            s.dec_use_flag = false;
        }
    }

    pub fn mark_display_pending(&mut self, surface_idx: u8) {
        if let Some(s) = self.surfaces.get_mut(surface_idx as usize) {
            s.disp_use_flag = true;
        }
    }

    /// `mark_frame_for_reuse(handle, pic_idx)` (§6): the consumer is done
    /// displaying this surface.
    pub fn release_display(&mut self, surface_idx: u8) {
        if let Some(s) = self.surfaces.get_mut(surface_idx as usize) {
            s.disp_use_flag = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_skips_displaying_surfaces() {
        let mut pool = DecodePool::new(2);
        let a = pool.acquire(0).unwrap();
        pool.release_decode(a);
        pool.mark_display_pending(a);
        let b = pool.acquire(1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn exhausted_pool_is_overflow() {
        let mut pool = DecodePool::new(1);
        pool.acquire(0).unwrap();
        assert!(pool.acquire(1).is_err());
    }

    #[test]
    fn release_display_frees_surface_for_reacquisition() {
        let mut pool = DecodePool::new(1);
        let a = pool.acquire(0).unwrap();
        pool.mark_display_pending(a);
        pool.release_decode(a);
        assert!(pool.acquire(1).is_err());
        pool.release_display(a);
        assert!(pool.acquire(1).is_ok());
    }
}
