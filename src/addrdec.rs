use crate::config::Geometry;

/// Decoded fields of a 32-bit address under a fixed cache geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedAddress {
    pub tag: u32,
    pub set_idx: u32,
    pub offset: u32,
}

/// Splits addresses into (tag, set index, block offset) by bit slicing.
///
/// Only set index and tag determine hits; the block offset is decoded for
/// diagnostics but carries no coherence meaning.
#[derive(Debug, Clone, Copy)]
pub struct AddressDecoder {
    offset_bits: u32,
    index_bits: u32,
    offset_mask: u32,
    index_mask: u32,
}

impl AddressDecoder {
    #[must_use]
    pub fn new(geometry: &Geometry) -> Self {
        let offset_bits = geometry.offset_bits();
        let index_bits = geometry.index_bits();
        Self {
            offset_bits,
            index_bits,
            offset_mask: (1 << offset_bits) - 1,
            index_mask: (1 << index_bits) - 1,
        }
    }

    #[must_use]
    pub fn tag(&self, addr: u32) -> u32 {
        addr >> (self.offset_bits + self.index_bits)
    }

    #[must_use]
    pub fn set_idx(&self, addr: u32) -> u32 {
        (addr >> self.offset_bits) & self.index_mask
    }

    #[must_use]
    pub fn offset(&self, addr: u32) -> u32 {
        addr & self.offset_mask
    }

    #[must_use]
    pub fn decode(&self, addr: u32) -> DecodedAddress {
        DecodedAddress {
            tag: self.tag(addr),
            set_idx: self.set_idx(addr),
            offset: self.offset(addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AddressDecoder, DecodedAddress};
    use crate::config::Geometry;
    use color_eyre::eyre;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_splits_fields() -> eyre::Result<()> {
        // 1 KiB, 2-way, 32-byte blocks: 5 offset bits, 16 sets, 4 index bits.
        let decoder = AddressDecoder::new(&Geometry::new(1024, 2, 32)?);
        assert_eq!(
            decoder.decode(0xDEAD_BEEF),
            DecodedAddress {
                tag: 0xDEAD_BEEF >> 9,
                set_idx: (0xDEAD_BEEF >> 5) & 0xF,
                offset: 0xDEAD_BEEF & 0x1F,
            }
        );
        assert_eq!(decoder.decode(0).tag, 0);
        assert_eq!(decoder.decode(0).set_idx, 0);
        assert_eq!(decoder.decode(0).offset, 0);
        Ok(())
    }

    #[test]
    fn fields_reassemble_to_the_address() -> eyre::Result<()> {
        let geometry = Geometry::new(4096, 4, 64)?;
        let decoder = AddressDecoder::new(&geometry);
        for addr in [0x0, 0x40, 0x1234_5678, 0xFFFF_FFFF] {
            let decoded = decoder.decode(addr);
            let reassembled = (decoded.tag << (geometry.offset_bits() + geometry.index_bits()))
                | (decoded.set_idx << geometry.offset_bits())
                | decoded.offset;
            assert_eq!(reassembled, addr);
        }
        Ok(())
    }

    #[test]
    fn single_set_geometry_has_empty_index() -> eyre::Result<()> {
        let decoder = AddressDecoder::new(&Geometry::new(64, 2, 32)?);
        assert_eq!(decoder.set_idx(0xFFFF_FFFF), 0);
        assert_eq!(decoder.tag(0xFFFF_FFFF), 0xFFFF_FFFF >> 5);
        Ok(())
    }

    #[test]
    fn same_block_addresses_share_set_and_tag() -> eyre::Result<()> {
        let decoder = AddressDecoder::new(&Geometry::new(1024, 2, 32)?);
        let a = decoder.decode(0x100);
        let b = decoder.decode(0x11F);
        assert_eq!((a.tag, a.set_idx), (b.tag, b.set_idx));
        assert_eq!(b.offset, 0x1F);
        Ok(())
    }
}
