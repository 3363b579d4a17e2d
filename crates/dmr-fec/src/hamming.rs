//! Systematic Hamming codes used by DMR. Codewords are bool slices with the
//! data bits first and the check bits appended, as they appear in the BPTC
//! matrices, the embedded LC matrix and the short LC.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HammingResult {
    /// Zero syndrome
    Valid,
    /// A single bit was flipped at this index
    Corrected(usize),
    /// Non-zero syndrome that matches no single bit
    Uncorrectable,
}

impl HammingResult {
    pub fn is_ok(self) -> bool {
        !matches!(self, HammingResult::Uncorrectable)
    }
}

/// Parity check description: check bit j is the XOR of the listed data bits
struct HammingCode {
    k: usize,
    checks: &'static [&'static [usize]],
}

impl HammingCode {
    const fn n(&self) -> usize {
        self.k + self.checks.len()
    }

    fn syndrome(&self, d: &[bool]) -> u32 {
        let mut s = 0u32;
        for (j, check) in self.checks.iter().enumerate() {
            let p = check.iter().fold(d[self.k + j], |acc, &i| acc ^ d[i]);
            s |= (p as u32) << j;
        }
        s
    }

    /// Syndrome produced by an error in bit i
    fn column(&self, i: usize) -> u32 {
        if i >= self.k {
            return 1 << (i - self.k);
        }
        self.checks
            .iter()
            .enumerate()
            .filter(|(_, check)| check.contains(&i))
            .fold(0, |acc, (j, _)| acc | (1 << j))
    }

    fn decode(&self, d: &mut [bool]) -> HammingResult {
        assert!(d.len() >= self.n(), "hamming: codeword too short");
        let s = self.syndrome(d);
        if s == 0 {
            return HammingResult::Valid;
        }
        match (0..self.n()).find(|&i| self.column(i) == s) {
            Some(i) => {
                d[i] = !d[i];
                HammingResult::Corrected(i)
            }
            None => HammingResult::Uncorrectable,
        }
    }

    fn encode(&self, d: &mut [bool]) {
        assert!(d.len() >= self.n(), "hamming: codeword too short");
        for (j, check) in self.checks.iter().enumerate() {
            d[self.k + j] = check.iter().fold(false, |acc, &i| acc ^ d[i]);
        }
    }
}

/// Hamming(15,11,3), BPTC(196,96) rows
const H15113: HammingCode = HammingCode {
    k: 11,
    checks: &[&[0, 1, 2, 3, 5, 7, 8], &[1, 2, 3, 4, 6, 8, 9], &[2, 3, 4, 5, 7, 9, 10], &[0, 1, 2, 4, 6, 7, 10]],
};

/// Hamming(16,11,4), embedded LC rows
const H16114: HammingCode = HammingCode {
    k: 11,
    checks: &[
        &[0, 1, 2, 3, 5, 7, 8],
        &[1, 2, 3, 4, 6, 8, 9],
        &[2, 3, 4, 5, 7, 9, 10],
        &[0, 1, 2, 4, 6, 7, 10],
        &[0, 2, 5, 6, 8, 9, 10],
    ],
};

/// Hamming(13,9,3), BPTC(196,96) columns
const H1393: HammingCode = HammingCode {
    k: 9,
    checks: &[&[0, 1, 3, 5, 6], &[0, 1, 2, 4, 6, 7], &[0, 1, 2, 3, 5, 7, 8], &[0, 2, 4, 5, 8]],
};

/// Hamming(17,12,3), short LC rows
const H17123: HammingCode = HammingCode {
    k: 12,
    checks: &[
        &[0, 1, 2, 3, 6, 7, 9],
        &[0, 1, 2, 3, 4, 7, 8, 10],
        &[1, 2, 3, 4, 5, 8, 9, 11],
        &[0, 1, 4, 5, 7, 10],
        &[0, 1, 2, 5, 6, 8, 11],
    ],
};

pub fn decode15113(d: &mut [bool]) -> HammingResult {
    H15113.decode(d)
}

pub fn encode15113(d: &mut [bool]) {
    H15113.encode(d)
}

pub fn decode16114(d: &mut [bool]) -> HammingResult {
    H16114.decode(d)
}

pub fn encode16114(d: &mut [bool]) {
    H16114.encode(d)
}

pub fn decode1393(d: &mut [bool]) -> HammingResult {
    H1393.decode(d)
}

pub fn encode1393(d: &mut [bool]) {
    H1393.encode(d)
}

pub fn decode17123(d: &mut [bool]) -> HammingResult {
    H17123.decode(d)
}

pub fn encode17123(d: &mut [bool]) {
    H17123.encode(d)
}
