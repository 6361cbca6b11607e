#![no_main]

use libfuzzer_sys::fuzz_target;
use dotshim::{
    metadata::BinaryModule,
    rewriter::{PipelineBuilder, PipelineConfig},
};

fuzz_target!(|data: &[u8]| {
    let Ok(mut module) = BinaryModule::from_bytes(data) else {
        return;
    };
    if let Ok(pipeline) = PipelineBuilder::new(PipelineConfig::default().with_paranoid(true)).build() {
        let _ = pipeline.rewrite(&mut module);
    }
});
