//-
// Copyright (c) 2026, Jason Lingle
//
// This file is part of elog-client.
//
// elog-client is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// elog-client is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with elog-client. If not, see <http://www.gnu.org/licenses/>.

//! Password preparation for the ELOG `upwd` field and cookie.
//!
//! The server stores and compares passwords hashed with SHA-crypt (the
//! SHA-256 variant of Ulrich Drepper's crypt scheme) using an *empty* salt
//! and the default 5000 rounds, then strips the `$5$$` scheme prefix. These
//! parameters are part of the server's wire protocol and must be reproduced
//! bit-exactly; the empty salt means equal passwords always hash equally,
//! which is an inherited property of the server API and not something this
//! client can fix.

use sha2::{Digest, Sha256};

/// The crypt(3) base64 alphabet. Not the MIME alphabet.
const CRYPT64: &[u8; 64] =
    b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

const ROUNDS: u32 = 5000;
const SCHEME_PREFIX: &str = "$5$$";

/// Turns a caller-supplied password into the form the server compares
/// against.
///
/// With `hash` set, the password is run through SHA-crypt with the fixed
/// parameters above and the checksum is returned without the scheme prefix.
/// Without it, the value is taken as already hashed and only a leading
/// `$5$$` is stripped, so the stored password never carries the prefix
/// either way.
pub fn prepare_password(password: &str, hash: bool) -> String {
    if password.is_empty() {
        String::new()
    } else if hash {
        sha256_crypt(password.as_bytes(), b"", ROUNDS)
    } else if let Some(stripped) = password.strip_prefix(SCHEME_PREFIX) {
        stripped.to_owned()
    } else {
        password.to_owned()
    }
}

/// SHA-crypt, SHA-256 flavour, returning the bare 43-character checksum.
///
/// This follows the published glibc algorithm step for step; the salt is
/// truncated to 16 bytes as there.
fn sha256_crypt(key: &[u8], salt: &[u8], rounds: u32) -> String {
    let salt = &salt[..salt.len().min(16)];

    // Digest B: key, salt, key.
    let mut alt = Sha256::new();
    alt.update(key);
    alt.update(salt);
    alt.update(key);
    let alt_result = alt.finalize();

    // Digest A: key, salt, then B folded in by key length, then one of
    // B/key per bit of the key length.
    let mut ctx = Sha256::new();
    ctx.update(key);
    ctx.update(salt);
    let mut cnt = key.len();
    while cnt > 32 {
        ctx.update(&alt_result);
        cnt -= 32;
    }
    ctx.update(&alt_result[..cnt]);
    let mut cnt = key.len();
    while cnt > 0 {
        if cnt & 1 != 0 {
            ctx.update(&alt_result);
        } else {
            ctx.update(key);
        }
        cnt >>= 1;
    }
    let mut alt_result = ctx.finalize();

    // Byte sequence P from a digest of key.len() copies of the key.
    let mut ctx = Sha256::new();
    for _ in 0..key.len() {
        ctx.update(key);
    }
    let temp = ctx.finalize();
    let p_bytes: Vec<u8> =
        temp.iter().cycle().take(key.len()).copied().collect();

    // Byte sequence S from a digest of 16 + A[0] copies of the salt.
    let mut ctx = Sha256::new();
    for _ in 0..16 + alt_result[0] as usize {
        ctx.update(salt);
    }
    let temp = ctx.finalize();
    let s_bytes: Vec<u8> =
        temp.iter().cycle().take(salt.len()).copied().collect();

    for round in 0..rounds {
        let mut ctx = Sha256::new();
        if round & 1 != 0 {
            ctx.update(&p_bytes);
        } else {
            ctx.update(&alt_result);
        }
        if round % 3 != 0 {
            ctx.update(&s_bytes);
        }
        if round % 7 != 0 {
            ctx.update(&p_bytes);
        }
        if round & 1 != 0 {
            ctx.update(&alt_result);
        } else {
            ctx.update(&p_bytes);
        }
        alt_result = ctx.finalize();
    }

    // The checksum permutes the digest bytes into 24-bit groups before
    // base64-encoding them; the order is fixed by the algorithm.
    let b = &alt_result;
    let mut out = String::with_capacity(43);
    let groups: [(u8, u8, u8, usize); 11] = [
        (b[0], b[10], b[20], 4),
        (b[21], b[1], b[11], 4),
        (b[12], b[22], b[2], 4),
        (b[3], b[13], b[23], 4),
        (b[24], b[4], b[14], 4),
        (b[15], b[25], b[5], 4),
        (b[6], b[16], b[26], 4),
        (b[27], b[7], b[17], 4),
        (b[18], b[28], b[8], 4),
        (b[9], b[19], b[29], 4),
        (0, b[31], b[30], 3),
    ];
    for &(b2, b1, b0, n) in &groups {
        let mut w =
            ((b2 as u32) << 16) | ((b1 as u32) << 8) | (b0 as u32);
        for _ in 0..n {
            out.push(CRYPT64[(w & 0x3f) as usize] as char);
            w >>= 6;
        }
    }
    out
}
