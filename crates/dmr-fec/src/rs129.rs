//! RS(12,9) over GF(2^8), ETSI TS 102 361-1 Annex B.3.1.
//! Protects the 9 bytes of a full LC with 3 parity bytes.

const NPAR: usize = 3;
const PRIM_POLY: u16 = 0x11D;

/// Generator polynomial coefficients, lowest order first (leading 1 included)
const POLY: [u8; NPAR + 1] = [64, 56, 14, 1];

const fn gf_tables() -> ([u8; 512], [u8; 256]) {
    let mut exp = [0u8; 512];
    let mut log = [0u8; 256];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < 255 {
        exp[i] = x as u8;
        log[x as usize] = i as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= PRIM_POLY;
        }
        i += 1;
    }
    while i < 512 {
        exp[i] = exp[i - 255];
        i += 1;
    }
    (exp, log)
}

static TABLES: ([u8; 512], [u8; 256]) = gf_tables();

fn gmult(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let (exp, log) = &TABLES;
    exp[log[a as usize] as usize + log[b as usize] as usize]
}

/// Parity bytes for a 9-byte payload, in transmission order
pub fn encode(msg: &[u8; 9]) -> [u8; NPAR] {
    let mut parity = [0u8; NPAR];
    for &m in msg {
        let dbyte = m ^ parity[NPAR - 1];
        for j in (1..NPAR).rev() {
            parity[j] = parity[j - 1] ^ gmult(POLY[j], dbyte);
        }
        parity[0] = gmult(POLY[0], dbyte);
    }
    [parity[2], parity[1], parity[0]]
}

/// True if bytes 9..12 are the parity of bytes 0..9. Detection only, no correction.
pub fn check(lc: &[u8; 12]) -> bool {
    let mut msg = [0u8; 9];
    msg.copy_from_slice(&lc[..9]);
    encode(&msg) == lc[9..12]
}
