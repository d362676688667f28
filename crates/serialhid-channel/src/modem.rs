//! Modem control lines (`TIOCMGET`/`TIOCMSET`).

use serde::Serialize;

/// State of the RS-232 modem control lines on an open terminal device.
///
/// DTR and RTS are outputs the host drives. CTS, DSR, CD and RI are inputs
/// reported by the peripheral; setting them has no effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModemBits {
    pub le: bool,
    pub dtr: bool,
    pub rts: bool,
    pub cts: bool,
    pub cd: bool,
    pub ri: bool,
    pub dsr: bool,
}

impl ModemBits {
    /// The host-driven outputs only.
    pub fn outputs(dtr: bool, rts: bool) -> Self {
        Self {
            dtr,
            rts,
            ..Self::default()
        }
    }

    /// Decode a `TIOCM_*` mask. Unknown bits are ignored.
    pub fn from_raw(raw: libc::c_int) -> Self {
        Self {
            le: raw & libc::TIOCM_LE != 0,
            dtr: raw & libc::TIOCM_DTR != 0,
            rts: raw & libc::TIOCM_RTS != 0,
            cts: raw & libc::TIOCM_CTS != 0,
            cd: raw & libc::TIOCM_CAR != 0,
            ri: raw & libc::TIOCM_RNG != 0,
            dsr: raw & libc::TIOCM_DSR != 0,
        }
    }

    /// Encode as a `TIOCM_*` mask.
    pub fn to_raw(self) -> libc::c_int {
        self.lines()
            .into_iter()
            .filter(|(_, _, on)| *on)
            .fold(0, |raw, (_, mask, _)| raw | mask)
    }

    /// Names of the asserted lines, in `TIOCM_*` bit order.
    pub fn asserted(self) -> Vec<&'static str> {
        self.lines()
            .into_iter()
            .filter(|(_, _, on)| *on)
            .map(|(name, _, _)| name)
            .collect()
    }

    fn lines(self) -> [(&'static str, libc::c_int, bool); 7] {
        [
            ("le", libc::TIOCM_LE, self.le),
            ("dtr", libc::TIOCM_DTR, self.dtr),
            ("rts", libc::TIOCM_RTS, self.rts),
            ("cts", libc::TIOCM_CTS, self.cts),
            ("cd", libc::TIOCM_CAR, self.cd),
            ("ri", libc::TIOCM_RNG, self.ri),
            ("dsr", libc::TIOCM_DSR, self.dsr),
        ]
    }
}
