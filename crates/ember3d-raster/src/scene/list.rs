use core::ops::Range;

use crate::error::{RenderError, RenderResult};

use super::key::{DrawClass, RenderKey};
use super::polygon::Polygon;

/// Hardware polygon RAM size.
pub const MAX_POLYGONS: usize = 2048;

/// A polygon scheduled for drawing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPolygon {
    /// Index into the frame's polygon array.
    pub source: usize,
    pub key: RenderKey,
    /// Index-buffer range, filled in by the assembler.
    pub indices: Range<u32>,
}

/// A maximal run of consecutive equal-key polygons, drawn by one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderBatch {
    pub key: RenderKey,
    pub indices: Range<u32>,
    /// Source index of the first polygon in the run.
    pub source: usize,
}

/// Per-frame draw order.
///
/// Holds an opaque prefix followed by the translucent suffix (translucent,
/// shadow-mask and shadow polygons). Both parts keep submission order: the
/// geometry engine already orders translucent polygons, and a shadow mask must
/// stay directly ahead of the shadows it gates.
#[derive(Debug, Default)]
pub struct RenderList {
    items: Vec<RenderPolygon>,
    opaque_count: usize,
}

impl RenderList {
    pub fn new() -> Self {
        Self { items: Vec::with_capacity(MAX_POLYGONS), opaque_count: 0 }
    }

    /// Clears recorded items. Keeps allocated capacity for reuse.
    pub fn clear(&mut self) {
        self.items.clear();
        self.opaque_count = 0;
    }

    /// Rebuilds the list from a frame's polygons.
    ///
    /// Degenerate polygons are dropped silently.
    pub fn build(&mut self, polygons: &[Polygon]) -> RenderResult<()> {
        self.clear();

        if polygons.len() > MAX_POLYGONS {
            return Err(RenderError::CapacityExceeded { what: "polygon", limit: MAX_POLYGONS });
        }

        let keyed = polygons
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_degenerate())
            .map(|(source, p)| RenderPolygon { source, key: RenderKey::for_polygon(p), indices: 0..0 });

        // Stable partition: opaque first, everything else after, each in input order.
        let mut deferred = Vec::new();
        for item in keyed {
            if item.key.class() == DrawClass::Opaque {
                self.items.push(item);
            } else {
                deferred.push(item);
            }
        }
        self.opaque_count = self.items.len();
        self.items.append(&mut deferred);

        let dropped = polygons.len() - self.items.len();
        if dropped > 0 {
            log::trace!("dropped {dropped} degenerate polygons");
        }
        Ok(())
    }

    #[inline]
    pub fn items(&self) -> &[RenderPolygon] {
        &self.items
    }

    #[inline]
    pub(crate) fn items_mut(&mut self) -> &mut [RenderPolygon] {
        &mut self.items
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn opaque_count(&self) -> usize {
        self.opaque_count
    }

    #[inline]
    pub fn translucent(&self) -> &[RenderPolygon] {
        &self.items[self.opaque_count..]
    }

    /// Index range covering every assembled triangle.
    pub fn all_indices(&self) -> Range<u32> {
        match (self.items.first(), self.items.last()) {
            (Some(first), Some(last)) => first.indices.start..last.indices.end,
            _ => 0..0,
        }
    }

    /// Batches of the translucent suffix, in draw order.
    pub fn batches(&self) -> impl Iterator<Item = RenderBatch> + '_ {
        let suffix = self.translucent();
        let mut i = 0;
        core::iter::from_fn(move || {
            let first = suffix.get(i)?;
            let mut end = first.indices.end;
            let mut j = i + 1;
            while let Some(next) = suffix.get(j) {
                if next.key != first.key {
                    break;
                }
                end = next.indices.end;
                j += 1;
            }
            i = j;
            Some(RenderBatch { key: first.key, indices: first.indices.start..end, source: first.source })
        })
    }
}
