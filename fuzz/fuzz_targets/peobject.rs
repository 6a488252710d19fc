#![no_main]

use dwarf_pe::{debuglink::debuglink_name, symbols::find_symbol, ObjectAccess, PeObject};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(object) = PeObject::from_mem(data.to_vec()) else {
        return;
    };

    for index in 0..object.section_count() {
        let _ = object.section_info(index);
        let _ = object.load_section(index);
    }
    let _ = debuglink_name(&object);
    let _ = find_symbol(&object, 0x0040_1000);
});
