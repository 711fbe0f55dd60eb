/// Picks whichever of left (`a`), above (`b`) and upper-left (`c`) is closest to `a + b - c`,
/// preferring `a`, then `b`, on ties.
pub(super) fn filter_paeth(a: u8, b: u8, c: u8) -> u8 {
    // With p = a + b - c:
    //     |p - a| = |b - c|
    //     |p - b| = |a - c|
    //     |p - c| = |(a - c) + (b - c)|
    let pa = (i16::from(b) - i16::from(c)).abs();
    let pb = (i16::from(a) - i16::from(c)).abs();
    let pc = ((i16::from(a) - i16::from(c)) + (i16::from(b) - i16::from(c))).abs();

    let mut out = a;
    let mut min = pa;

    if pb < min {
        min = pb;
        out = b;
    }
    if pc < min {
        out = c;
    }

    out
}
