//! Host/network byte order conversion (`<arpa/inet.h>`)

/// Host to network order, 32 bits
#[inline]
pub const fn htonl(x: u32) -> u32 {
    x.to_be()
}

/// Network to host order, 32 bits
#[inline]
pub const fn ntohl(x: u32) -> u32 {
    u32::from_be(x)
}

/// Host to network order, 16 bits
#[inline]
pub const fn htons(x: u16) -> u16 {
    x.to_be()
}

/// Network to host order, 16 bits
#[inline]
pub const fn ntohs(x: u16) -> u16 {
    u16::from_be(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_order_bytes() {
        assert_eq!(htonl(0x0102_0304).to_ne_bytes(), [1, 2, 3, 4]);
        assert_eq!(htons(0x0a0b).to_ne_bytes(), [0x0a, 0x0b]);
    }

    #[test]
    fn test_conversions_are_inverse() {
        for value in [0u32, 1, 0x1234_5678, u32::MAX] {
            assert_eq!(ntohl(htonl(value)), value);
        }
        for value in [0u16, 0x00ff, 0xbeef, u16::MAX] {
            assert_eq!(ntohs(htons(value)), value);
        }
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn test_little_endian_swaps() {
        assert_eq!(htonl(0x1122_3344), 0x4433_2211);
        assert_eq!(ntohs(0x1122), 0x2211);
    }
}
