#![no_main]

use argos::value::parse_bool_literal;
use argos::ArgValue;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|s: String| {
    // Every primitive `ArgValue::parse_str` and the boolean-literal parser
    // must return `None` rather than panic on malformed input (spec §4.5:
    // a failed conversion is reported as `ParseError::InvalidValue`, never a
    // crash).
    let _ = <String as ArgValue>::parse_str(&s);
    let _ = <i64 as ArgValue>::parse_str(&s);
    let _ = <i32 as ArgValue>::parse_str(&s);
    let _ = <u16 as ArgValue>::parse_str(&s);
    let _ = <u32 as ArgValue>::parse_str(&s);
    let _ = <u64 as ArgValue>::parse_str(&s);
    let _ = <f64 as ArgValue>::parse_str(&s);
    let _ = <std::path::PathBuf as ArgValue>::parse_str(&s);
    let _ = parse_bool_literal(&s);
});
