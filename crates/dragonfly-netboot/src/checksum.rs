//! Internet checksum (RFC 1071)

/// Compute the IPv4 header checksum over big-endian 16-bit words
///
/// The checksum word inside `header` must be zero. Inserting the result and
/// summing again yields zero.
pub fn compute_ip_checksum(header: &[u16]) -> u16 {
    let mut sum: u32 = header.iter().map(|&w| w as u32).sum();
    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

/// Split header bytes into big-endian words; a trailing odd byte is zero-padded
pub fn header_words(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| u16::from_be_bytes([pair[0], *pair.get(1).unwrap_or(&0)]))
        .collect()
}
