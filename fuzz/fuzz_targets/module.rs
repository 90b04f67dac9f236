#![no_main]

use libfuzzer_sys::fuzz_target;
use modcompat::metadata::module::Module;

fuzz_target!(|data: &[u8]| {
    if let Ok(module) = Module::from_mem(data.to_vec()) {
        let _ = module.to_bytes();
    }
});
