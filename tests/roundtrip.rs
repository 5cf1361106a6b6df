use anyhow::Result;
use sexptree::export::export;
use sexptree::schema::{build, Generic};
use sexptree::tokenize::tokenize;

fn rebuild(text: &str) -> Result<String> {
    let node = build(&tokenize(text)?, &Generic)?;
    let mut out = Vec::new();
    export(&mut out, &node)?;
    Ok(String::from_utf8(out)?)
}

#[test]
fn export_is_stable_after_one_pass() -> Result<()> {
    let src = "(module DIP (layer F.Cu) (tedit 0)\n\
               \x20 (pad 1 thru_hole circle (at -8.89 -6.35) (size 1.05 1.05))\n\
               \x20 (pad 2 thru_hole circle (at -8.89 6.35) (size 1.05 1.05)))";
    let once = rebuild(src)?;
    let twice = rebuild(&once)?;
    assert_eq!(once, twice);
    // the original atoms survive byte for byte
    for atom in ["module", "DIP", "F.Cu", "0", "thru_hole", "circle",
                 "-8.89", "-6.35", "1.05"] {
        assert!(once.contains(atom), "missing {atom:?} in {once:?}");
    }
    Ok(())
}

#[test]
fn key_order_is_preserved() -> Result<()> {
    let out = rebuild("(m (b 1) (a 2) (c 3))")?;
    let b = out.find("(b").unwrap();
    let a = out.find("(a").unwrap();
    let c = out.find("(c").unwrap();
    assert!(b < a && a < c);
    Ok(())
}

#[test]
fn repeated_keys_survive_as_siblings() -> Result<()> {
    let out = rebuild("(m (pad 1) (pad 2) (pad 3))")?;
    assert_eq!(out.matches("(pad ").count(), 3);
    let again = rebuild(&out)?;
    assert_eq!(out, again);
    Ok(())
}

#[test]
fn quoted_atoms_round_trip() -> Result<()> {
    let out = rebuild(r#"(name "REF **" plain)"#)?;
    assert!(out.contains(r#""REF **""#));
    assert!(out.contains("plain"));
    let again = rebuild(&out)?;
    assert_eq!(out, again);
    Ok(())
}

#[test]
fn integral_floats_round_trip() -> Result<()> {
    // 7.0 coerces to a float and must export as 7.0, not 7
    let out = rebuild("(m (w 7.0) (n 7))")?;
    assert!(out.contains("(w 7.0)"), "got {out:?}");
    assert!(out.contains("(n 7)"), "got {out:?}");
    let again = rebuild(&out)?;
    assert_eq!(out, again);
    Ok(())
}
