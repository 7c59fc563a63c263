//! Presentable Token Generation
//!
//! Short, human-typeable tokens: ticket codes printed on credentials and
//! team invite codes. Both are distinct from entity identity (uuid).

use rand::Rng;

const HEX_UPPER: &[u8] = b"0123456789ABCDEF";
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Ticket code generator.
///
/// Format: `TKT-` followed by 10 uppercase hex characters. 40 bits of
/// randomness keeps collisions negligible at realistic ticket volumes; the
/// unique index on the column is the backstop.
pub struct TicketCode;

impl TicketCode {
    pub const PREFIX: &'static str = "TKT-";

    pub fn generate() -> String {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..10)
            .map(|_| HEX_UPPER[rng.gen_range(0..HEX_UPPER.len())] as char)
            .collect();
        format!("{}{}", Self::PREFIX, suffix)
    }

    pub fn is_valid(code: &str) -> bool {
        code.strip_prefix(Self::PREFIX)
            .map(|s| s.len() == 10 && s.bytes().all(|b| HEX_UPPER.contains(&b)))
            .unwrap_or(false)
    }
}

/// Team invite code generator.
///
/// 6 characters, A-Z and 0-9, drawn from the thread-local RNG, stored
/// uppercase and normalized on lookup. Collisions are expected at scale and
/// handled by a bounded retry loop in the team service, never assumed away.
pub struct InviteCode;

impl InviteCode {
    pub const LEN: usize = 6;

    pub fn generate() -> String {
        let mut rng = rand::thread_rng();
        (0..Self::LEN)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }

    /// Case-normalize a user-typed code for lookup.
    pub fn normalize(code: &str) -> String {
        code.trim().to_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ticket_code_format() {
        let code = TicketCode::generate();
        assert!(code.starts_with("TKT-"));
        assert_eq!(code.len(), 14);
        assert!(TicketCode::is_valid(&code));
    }

    #[test]
    fn test_ticket_code_rejects_foreign_strings() {
        assert!(!TicketCode::is_valid("TKT-"));
        assert!(!TicketCode::is_valid("TKT-12345678zz"));
        assert!(!TicketCode::is_valid("ABC-1234567890"));
        assert!(!TicketCode::is_valid("TKT-1234567890AB"));
    }

    #[test]
    fn test_ticket_code_uniqueness() {
        let codes: HashSet<String> = (0..1000).map(|_| TicketCode::generate()).collect();
        assert_eq!(codes.len(), 1000);
    }

    #[test]
    fn test_invite_code_alphabet() {
        let code = InviteCode::generate();
        assert_eq!(code.len(), InviteCode::LEN);
        assert!(code.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
    }

    #[test]
    fn test_invite_code_normalization() {
        assert_eq!(InviteCode::normalize(" ab12cd "), "AB12CD");
    }
}
