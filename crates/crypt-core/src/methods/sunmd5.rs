//! Sun MD5 crypt, `$md5[,rounds=N]$salt$`.
//!
//! Each of the 4096 + N rounds hashes the previous digest, optionally a
//! fixed passage of text chosen by a digest-driven coin toss, and the round
//! number in decimal.

use md5::{Digest, Md5};

use super::{finalize_into, parse_rounds};
use crate::b64::{span_ascii64, ASCII64};
use crate::error::{CryptError, Result};
use crate::registry::HashMethod;
use crate::scratch::{Output, Scratch};

const SUNMD5_PREFIX: &[u8] = b"$md5";
// $md5,rounds=4294963199$12345678$
const SUNMD5_MAX_SETTING_LEN: usize = 32;
const SUNMD5_BARE_OUTPUT_LEN: usize = 22;
const SUNMD5_MAX_ROUNDS: u64 = 0xffff_ffff;
const BASE_ROUNDS: u32 = 4096;

/// Mixed into a round when the coin toss comes up true, trailing NUL
/// included. Hamlet, Act III scene 1, public domain.
const HAMLET_QUOTATION: &[u8] = concat!(
    "To be, or not to be,--that is the question:--\n",
    "Whether 'tis nobler in the mind to suffer\n",
    "The slings and arrows of outrageous fortune\n",
    "Or to take arms against a sea of troubles,\n",
    "And by opposing end them?--To die,--to sleep,--\n",
    "No more; and by a sleep to say we end\n",
    "The heartache, and the thousand natural shocks\n",
    "That flesh is heir to,--'tis a consummation\n",
    "Devoutly to be wish'd. To die,--to sleep;--\n",
    "To sleep! perchance to dream:--ay, there's the rub;\n",
    "For in that sleep of death what dreams may come,\n",
    "When we have shuffled off this mortal coil,\n",
    "Must give us pause: there's the respect\n",
    "That makes calamity of so long life;\n",
    "For who would bear the whips and scorns of time,\n",
    "The oppressor's wrong, the proud man's contumely,\n",
    "The pangs of despis'd love, the law's delay,\n",
    "The insolence of office, and the spurns\n",
    "That patient merit of the unworthy takes,\n",
    "When he himself might his quietus make\n",
    "With a bare bodkin? who would these fardels bear,\n",
    "To grunt and sweat under a weary life,\n",
    "But that the dread of something after death,--\n",
    "The undiscover'd country, from whose bourn\n",
    "No traveller returns,--puzzles the will,\n",
    "And makes us rather bear those ills we have\n",
    "Than fly to others that we know not of?\n",
    "Thus conscience does make cowards of us all;\n",
    "And thus the native hue of resolution\n",
    "Is sicklied o'er with the pale cast of thought;\n",
    "And enterprises of great pith and moment,\n",
    "With this regard, their currents turn awry,\n",
    "And lose the name of action.--Soft you now!\n",
    "The fair Ophelia!--Nymph, in thy orisons\n",
    "Be all my sins remember'd.\n",
    "\0",
)
.as_bytes();

fn get_nth_bit(digest: &[u8], n: u32) -> u32 {
    let n = n % 128;
    u32::from(digest[(n / 8) as usize] >> (n % 8)) & 1
}

fn muffet_coin_toss(dg: &[u8], round: u32) -> bool {
    let pick = |i: usize| -> u32 {
        let a = u32::from(dg[i % 16]);
        let b = u32::from(dg[(i + 3) % 16]);
        let r = a >> (b % 5);
        let mut v = u32::from(dg[(r % 16) as usize]);
        if b & (1 << (a % 8)) != 0 {
            v /= 2;
        }
        get_nth_bit(dg, v)
    };

    let mut x = 0u32;
    let mut y = 0u32;
    for i in 0..8 {
        x |= pick(i) << i;
        y |= pick(i + 8) << i;
    }
    if get_nth_bit(dg, round) != 0 {
        x /= 2;
    }
    if get_nth_bit(dg, round.wrapping_add(64)) != 0 {
        y /= 2;
    }
    get_nth_bit(dg, x) ^ get_nth_bit(dg, y) != 0
}

fn push_itoa64(text: &mut Vec<u8>, b0: u8, b1: u8, b2: u8, n: usize) {
    let mut value = u32::from(b0) | (u32::from(b1) << 8) | (u32::from(b2) << 16);
    for _ in 0..n {
        text.push(ASCII64[(value & 0x3f) as usize]);
        value >>= 6;
    }
}

/// Rounds to run and the length of the setting prefix that is hashed and
/// echoed into the output.
fn parse_setting(setting: &[u8]) -> Result<(u32, usize)> {
    let after = setting.strip_prefix(SUNMD5_PREFIX).ok_or(CryptError::Invalid)?;
    match after.first() {
        Some(b'$') | Some(b',') => {}
        _ => return Err(CryptError::Invalid),
    }

    // rounds= may follow either separator.
    let mut p = SUNMD5_PREFIX.len() + 1;
    let mut nrounds = BASE_ROUNDS;
    if let Some(num) = setting[p..].strip_prefix(b"rounds=") {
        let (arounds, len) = parse_rounds(num, SUNMD5_MAX_ROUNDS).ok_or(CryptError::Invalid)?;
        if num.get(len) != Some(&b'$') {
            return Err(CryptError::Invalid);
        }
        nrounds = nrounds.wrapping_add(arounds as u32);
        p += b"rounds=".len() + len + 1;
    }

    p += span_ascii64(&setting[p..]);
    match setting.get(p) {
        None | Some(b'$') => {}
        Some(_) => return Err(CryptError::Invalid),
    }
    // A '$' followed by another '$' or the end belongs to the salt.
    if setting.get(p) == Some(&b'$') && matches!(setting.get(p + 1), None | Some(b'$')) {
        p += 1;
    }
    Ok((nrounds, p))
}

pub struct SunMd5;

pub static SUN_MD5: SunMd5 = SunMd5;

impl HashMethod for SunMd5 {
    fn prefix(&self) -> &'static str {
        "$md5"
    }

    fn name(&self) -> &'static str {
        "sunmd5"
    }

    fn random_bytes(&self) -> usize {
        8
    }

    fn is_strong(&self) -> bool {
        false
    }

    fn crypt(&self, phrase: &[u8], setting: &[u8], out: &mut Output<'_>, scratch: &mut Scratch<'_>) -> Result<()> {
        let (nrounds, saltlen) = parse_setting(setting)?;
        out.require(saltlen + SUNMD5_BARE_OUTPUT_LEN + 2)?;
        let dg = scratch.claim(16)?;

        let mut ctx = Md5::new();
        ctx.update(phrase);
        ctx.update(&setting[..saltlen]);
        finalize_into(ctx, dg);

        for i in 0..nrounds {
            let mut ctx = Md5::new();
            ctx.update(&*dg);
            if muffet_coin_toss(dg, i) {
                ctx.update(HAMLET_QUOTATION);
            }
            ctx.update(i.to_string().as_bytes());
            finalize_into(ctx, dg);
        }

        let mut text = Vec::with_capacity(saltlen + SUNMD5_BARE_OUTPUT_LEN + 1);
        text.extend_from_slice(&setting[..saltlen]);
        text.push(b'$');
        push_itoa64(&mut text, dg[12], dg[6], dg[0], 4);
        push_itoa64(&mut text, dg[13], dg[7], dg[1], 4);
        push_itoa64(&mut text, dg[14], dg[8], dg[2], 4);
        push_itoa64(&mut text, dg[15], dg[9], dg[3], 4);
        push_itoa64(&mut text, dg[5], dg[10], dg[4], 4);
        push_itoa64(&mut text, dg[11], 0, 0, 2);
        out.commit(&text)
    }

    fn gensalt(&self, count: u64, rbytes: &[u8], out: &mut Output<'_>) -> Result<()> {
        out.require(SUNMD5_MAX_SETTING_LEN + 1)?;
        if rbytes.len() < 6 + 2 {
            return Err(CryptError::Invalid);
        }

        // Sixteen random bits ride along in the round count.
        let count = count.clamp(32_768, SUNMD5_MAX_ROUNDS - 65_536)
            + (u64::from(rbytes[0]) << 8)
            + u64::from(rbytes[1]);

        let mut text = format!("$md5,rounds={count}$").into_bytes();
        push_itoa64(&mut text, rbytes[2], rbytes[3], rbytes[4], 4);
        push_itoa64(&mut text, rbytes[5], rbytes[6], rbytes[7], 4);
        text.push(b'$');
        out.commit(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scratch::c_str;

    fn hash(phrase: &[u8], setting: &[u8]) -> Result<String> {
        let mut obuf = [0u8; 384];
        let mut sbuf = [0u8; 64];
        {
            let mut out = Output::new(&mut obuf);
            let mut scratch = Scratch::new(&mut sbuf);
            SUN_MD5.crypt(phrase, setting, &mut out, &mut scratch)?;
        }
        Ok(String::from_utf8(c_str(&obuf).to_vec()).unwrap())
    }

    #[test]
    fn quotation_is_nul_terminated() {
        assert!(HAMLET_QUOTATION.starts_with(b"To be, or not to be,"));
        assert!(HAMLET_QUOTATION.ends_with(b"Be all my sins remember'd.\n\0"));
    }

    #[test]
    fn setting_prefix_length() {
        assert_eq!(parse_setting(b"$md5$1xMeE.at$"), Ok((4096, 14)));
        assert_eq!(parse_setting(b"$md5$1xMeE.at$$"), Ok((4096, 14)));
        assert_eq!(parse_setting(b"$md5$1xMeE.at$x"), Ok((4096, 13)));
        assert_eq!(parse_setting(b"$md5$1xMeE.at"), Ok((4096, 13)));
        assert_eq!(parse_setting(b"$md5,rounds=123$1xMeE.at$"), Ok((4219, 25)));
        assert_eq!(parse_setting(b"$md5$rounds=1$ab"), Ok((4097, 16)));
    }

    #[test]
    fn setting_errors() {
        for bad in [
            &b"$md5"[..],
            b"$md5x",
            b"$md5,rounds=$ab$",
            b"$md5,rounds=0$ab$",
            b"$md5,rounds=012$ab$",
            b"$md5,rounds=4294967296$ab$",
            b"$md5,rounds=12",
            b"$md5$ab:cd",
        ] {
            assert_eq!(parse_setting(bad), Err(CryptError::Invalid), "{:?}", String::from_utf8_lossy(bad));
        }
    }

    #[test]
    fn hash_extends_setting() {
        let h = hash(b"Gpcs3_adm", b"$md5$zrdhpMlZ$").unwrap();
        assert!(h.starts_with("$md5$zrdhpMlZ$$"));
        assert_eq!(h.len(), "$md5$zrdhpMlZ$".len() + 1 + SUNMD5_BARE_OUTPUT_LEN);
        assert_eq!(h, "$md5$zrdhpMlZ$$wBvMOEqbSjU.hu5T2VEP01");
    }

    #[test]
    fn gensalt_folds_random_into_rounds() {
        let mut buf = [0u8; 64];
        let mut out = Output::new(&mut buf);
        SUN_MD5.gensalt(0, &[0, 1, 0, 0, 0, 0, 0, 0], &mut out).unwrap();
        assert_eq!(c_str(&buf), b"$md5,rounds=32769$........$");
    }
}
