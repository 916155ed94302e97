/// `dns.flags.rcode`: the fixed response-code set from §3.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResponseCode {
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
    YxDomain,
    XrrSet,
    NotAuth,
    NotZone,
}

impl ResponseCode {
    pub fn to_num(self) -> u8 {
        match self {
            Self::NoError => 0,
            Self::FormErr => 1,
            Self::ServFail => 2,
            Self::NxDomain => 3,
            Self::NotImp => 4,
            Self::Refused => 5,
            Self::YxDomain => 6,
            Self::XrrSet => 7,
            Self::NotAuth => 8,
            Self::NotZone => 9,
        }
    }

    pub fn from_num(num: u8) -> Option<Self> {
        match num {
            0 => Some(Self::NoError),
            1 => Some(Self::FormErr),
            2 => Some(Self::ServFail),
            3 => Some(Self::NxDomain),
            4 => Some(Self::NotImp),
            5 => Some(Self::Refused),
            6 => Some(Self::YxDomain),
            7 => Some(Self::XrrSet),
            8 => Some(Self::NotAuth),
            9 => Some(Self::NotZone),
            _ => None,
        }
    }
}
