/// `dns.qry.type`: the fixed, two-member query type set this system
/// answers for. Anything else is a [`crate::FormatError::InvalidValue`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum QueryType {
    A,
    NS,
}

impl QueryType {
    pub fn to_num(self) -> u8 {
        match self {
            Self::A => 1,
            Self::NS => 2,
        }
    }

    pub fn from_num(num: u8) -> Option<Self> {
        match num {
            1 => Some(Self::A),
            2 => Some(Self::NS),
            _ => None,
        }
    }

    /// `match_type("A")` is true iff the query type is `A` (1).
    pub fn matches_name(self, name: &str) -> bool {
        match self {
            Self::A => name.eq_ignore_ascii_case("A"),
            Self::NS => name.eq_ignore_ascii_case("NS"),
        }
    }
}
