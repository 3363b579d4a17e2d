//! Shortened Reed-Solomon codes over GF(64), symbols of 6 bits.
//! RS(24,12,13), RS(24,16,9) and RS(36,20,17) are shortened from RS(63,k):
//! the missing leading symbols are implicit zeros.
//!
//! Codewords are packed MSB first into byte buffers, payload symbols first and
//! parity symbols following. Roots are alpha^1..alpha^(n-k).

const GF_PRIM: u16 = 0x43;
const GF_SIZE: usize = 63;
const MAX_ROOTS: usize = 16;

const fn gf64_tables() -> ([u8; 2 * GF_SIZE], [u8; 64]) {
    let mut exp = [0u8; 2 * GF_SIZE];
    let mut log = [0u8; 64];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < GF_SIZE {
        exp[i] = x as u8;
        log[x as usize] = i as u8;
        x <<= 1;
        if x & 0x40 != 0 {
            x ^= GF_PRIM;
        }
        i += 1;
    }
    while i < 2 * GF_SIZE {
        exp[i] = exp[i - GF_SIZE];
        i += 1;
    }
    (exp, log)
}

static GF64: ([u8; 2 * GF_SIZE], [u8; 64]) = gf64_tables();

#[inline]
fn alpha(i: usize) -> u8 {
    GF64.0[i % GF_SIZE]
}

#[inline]
fn gf_log(a: u8) -> usize {
    GF64.1[a as usize] as usize
}

fn gf_mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    GF64.0[gf_log(a) + gf_log(b)]
}

fn gf_inv(a: u8) -> u8 {
    debug_assert!(a != 0);
    GF64.0[GF_SIZE - gf_log(a)]
}

fn read_symbol(data: &[u8], i: usize) -> u8 {
    let mut s = 0u8;
    for b in 0..6 {
        let pos = i * 6 + b;
        s = (s << 1) | ((data[pos / 8] >> (7 - pos % 8)) & 1);
    }
    s
}

fn write_symbol(data: &mut [u8], i: usize, s: u8) {
    for b in 0..6 {
        let pos = i * 6 + b;
        let mask = 0x80u8 >> (pos % 8);
        if (s >> (5 - b)) & 1 == 1 {
            data[pos / 8] |= mask;
        } else {
            data[pos / 8] &= !mask;
        }
    }
}

/// Generator polynomial, highest order coefficient first
fn generator(nroots: usize) -> [u8; MAX_ROOTS + 1] {
    let mut g = [0u8; MAX_ROOTS + 1];
    g[0] = 1;
    for i in 1..=nroots {
        // g *= (x - alpha^i)
        let root = alpha(i);
        for j in (1..=i).rev() {
            g[j] ^= gf_mul(g[j - 1], root);
        }
    }
    g
}

/// RS(N,K) over GF(64), shortened from RS(63,K+63-N)
pub struct RsGf64<const N: usize, const K: usize>;

/// Used by P25 LDU1 link control
pub type Rs241213 = RsGf64<24, 12>;
/// Used by P25 LDU2 encryption sync
pub type Rs241609 = RsGf64<24, 16>;
/// Used by P25 header data units
pub type Rs362017 = RsGf64<36, 20>;

impl<const N: usize, const K: usize> RsGf64<N, K> {
    const NROOTS: usize = N - K;
    /// Bytes needed to hold a full codeword
    pub const CODEWORD_BYTES: usize = (N * 6).div_ceil(8);

    /// Maximum number of correctable symbol errors
    pub const fn t() -> usize {
        (N - K) / 2
    }

    /// Computes parity from the first K symbols of `data` and writes it after them
    pub fn encode(data: &mut [u8]) {
        assert!(data.len() >= Self::CODEWORD_BYTES, "rs: buffer too short");
        let nroots = Self::NROOTS;
        let g = generator(nroots);

        let mut rem = [0u8; MAX_ROOTS];
        for i in 0..K {
            let fb = read_symbol(data, i) ^ rem[0];
            rem.copy_within(1..nroots, 0);
            rem[nroots - 1] = 0;
            if fb != 0 {
                for j in 0..nroots {
                    rem[j] ^= gf_mul(g[j + 1], fb);
                }
            }
        }

        for (j, r) in rem[..nroots].iter().enumerate() {
            write_symbol(data, K + j, *r);
        }
    }

    /// Corrects up to t symbol errors and rewrites the payload symbols.
    /// Returns false, leaving `data` untouched, when the codeword is not decodable.
    pub fn decode(data: &mut [u8]) -> bool {
        assert!(data.len() >= Self::CODEWORD_BYTES, "rs: buffer too short");
        let nroots = Self::NROOTS;

        let mut cw = [0u8; GF_SIZE];
        for (i, s) in cw[..N].iter_mut().enumerate() {
            *s = read_symbol(data, i);
        }

        // Syndromes S_j = c(alpha^j), first symbol is the highest power
        let mut synd = [0u8; MAX_ROOTS];
        for (j, s) in synd[..nroots].iter_mut().enumerate() {
            let a = alpha(j + 1);
            *s = cw[..N].iter().fold(0, |acc, &c| gf_mul(acc, a) ^ c);
        }
        if synd[..nroots].iter().all(|s| *s == 0) {
            return true;
        }

        // Berlekamp-Massey
        let mut lambda = [0u8; MAX_ROOTS + 1];
        let mut prev = [0u8; MAX_ROOTS + 1];
        lambda[0] = 1;
        prev[0] = 1;
        let mut l = 0usize;
        let mut m = 1usize;
        let mut b = 1u8;
        for r in 0..nroots {
            let mut d = synd[r];
            for i in 1..=l {
                d ^= gf_mul(lambda[i], synd[r - i]);
            }
            if d == 0 {
                m += 1;
                continue;
            }
            let coef = gf_mul(d, gf_inv(b));
            let saved = lambda;
            for i in m..=nroots {
                lambda[i] ^= gf_mul(coef, prev[i - m]);
            }
            if 2 * l <= r {
                l = r + 1 - l;
                prev = saved;
                b = d;
                m = 1;
            } else {
                m += 1;
            }
        }
        if l > Self::t() {
            return false;
        }

        // Chien search over all 63 positions of the unshortened code
        let mut locs = [0usize; MAX_ROOTS];
        let mut nlocs = 0;
        for deg in 0..GF_SIZE {
            let xinv = alpha(GF_SIZE - deg);
            let v = (0..=l).rev().fold(0u8, |acc, i| gf_mul(acc, xinv) ^ lambda[i]);
            if v == 0 {
                if nlocs == MAX_ROOTS || deg >= N {
                    // Root in the shortened, implicitly zero part
                    return false;
                }
                locs[nlocs] = deg;
                nlocs += 1;
            }
        }
        if nlocs != l {
            return false;
        }

        // Forney, error evaluator omega = S(x) * lambda(x) mod x^nroots
        let mut omega = [0u8; MAX_ROOTS];
        for i in 0..nroots {
            for j in 0..=i.min(l) {
                omega[i] ^= gf_mul(lambda[j], synd[i - j]);
            }
        }

        for &deg in &locs[..nlocs] {
            let xinv = alpha(GF_SIZE - deg);
            let num = (0..nroots).rev().fold(0u8, |acc, i| gf_mul(acc, xinv) ^ omega[i]);
            let mut den = 0u8;
            for i in (1..=l).step_by(2) {
                den ^= gf_mul(lambda[i], alpha(gf_log(xinv) * (i - 1)));
            }
            if den == 0 {
                return false;
            }
            cw[N - 1 - deg] ^= gf_mul(num, gf_inv(den));
        }

        for (i, s) in cw[..K].iter().enumerate() {
            write_symbol(data, i, *s);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_codeword<const N: usize, const K: usize>() -> Vec<u8> {
        let mut data = vec![0u8; RsGf64::<N, K>::CODEWORD_BYTES];
        for i in 0..K {
            write_symbol(&mut data, i, rand::random_range(0..64));
        }
        RsGf64::<N, K>::encode(&mut data);
        data
    }

    fn corrupt(data: &mut [u8], positions: impl Iterator<Item = usize>, value: u8) {
        for i in positions {
            let s = read_symbol(data, i);
            write_symbol(data, i, s ^ value);
        }
    }

    fn payload<const N: usize, const K: usize>(data: &[u8]) -> Vec<u8> {
        (0..K).map(|i| read_symbol(data, i)).collect()
    }

    fn check_code<const N: usize, const K: usize>() {
        let t = RsGf64::<N, K>::t();
        for _ in 0..20 {
            let clean = random_codeword::<N, K>();

            let mut data = clean.clone();
            assert!(RsGf64::<N, K>::decode(&mut data));
            assert_eq!(data, clean);

            // t errors spread across payload and parity
            let mut data = clean.clone();
            let errs: Vec<usize> = (0..t).map(|i| (i * N / t + 1) % N).collect();
            corrupt(&mut data, errs.into_iter(), rand::random_range(1..64));
            assert!(RsGf64::<N, K>::decode(&mut data), "RS({},{}) failed with t errors", N, K);
            assert_eq!(payload::<N, K>(&data), payload::<N, K>(&clean));
        }
    }

    #[test]
    fn test_rs241213() {
        check_code::<24, 12>();
    }

    #[test]
    fn test_rs241609() {
        check_code::<24, 16>();
    }

    #[test]
    fn test_rs362017() {
        check_code::<36, 20>();
    }

    #[test]
    fn test_too_many_errors_rejected() {
        fn check<const N: usize, const K: usize>() {
            let t = RsGf64::<N, K>::t();
            let clean = random_codeword::<N, K>();
            let mut data = clean.clone();
            corrupt(&mut data, (0..=t).map(|i| i * 2), 0x2A);
            let before = data.clone();
            assert!(!RsGf64::<N, K>::decode(&mut data), "RS({},{}) accepted t+1 errors", N, K);
            assert_eq!(data, before);
        }
        check::<24, 12>();
        check::<24, 16>();
        check::<36, 20>();
    }

    #[test]
    fn test_zero_codeword() {
        let mut data = [0u8; 18];
        Rs241213::encode(&mut data);
        assert_eq!(data, [0u8; 18]);
        assert!(Rs241213::decode(&mut data));
    }
}
