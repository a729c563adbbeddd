use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use spvinstr::{
    Module,
    spirv::{DecorationKind, Op, SpirvVersion, StorageClass},
    tests_utils::ModuleBuilder,
};
use spvpost::{FinalizeConfig, VendorFeatures, finalize};

/// Many small functions, each with a physical storage buffer access chain,
/// a local holding a physical pointer, some 8/16-bit arithmetic and a dead
/// block whose results are decorated.
fn build_module(functions: usize) -> Module {
    let mut rng = ChaCha20Rng::seed_from_u64(0x42);
    let mut b = ModuleBuilder::new(SpirvVersion::V1_2);

    let void = b.type_void();
    let float = b.type_float(32);
    let half = b.type_float(16);
    let byte = b.type_int(8, false);
    let arr = b.type_runtime_array(float);
    let record = b.type_struct(&[half, byte, arr]);
    let record_ptr = b.type_pointer(StorageClass::PhysicalStorageBuffer, record);
    let float_ptr = b.type_pointer(StorageClass::PhysicalStorageBuffer, float);
    let holder_ptr = b.type_pointer(StorageClass::Function, record_ptr);
    b.decorate(arr, DecorationKind::ArrayStride, &[4]);
    b.member_decorate(record, 0, DecorationKind::Offset, 0);
    b.member_decorate(record, 1, DecorationKind::Offset, 2);
    b.member_decorate(record, 2, DecorationKind::Offset, 16);
    let two = b.constant_u32(2);
    let small = b.constant(byte, 3);
    let h = b.constant(half, 0x3c00);

    for _ in 0..functions {
        b.begin_function(void);
        let buf = b.parameter(record_ptr);
        b.begin_block();
        b.local_variable(holder_ptr);
        let element = b.constant_u32(rng.random_range(0..64));
        let chain = b.access_chain(float_ptr, buf, &[two, element]);
        let value = b.load(float, chain, Some(16));
        b.store(chain, value, Some(16));
        let sum = b.emit_value(Op::IAdd, byte, vec![small.into(), small.into()]);
        let scaled = b.emit_value(Op::FMul, half, vec![h.into(), h.into()]);
        b.decorate(sum, DecorationKind::RelaxedPrecision, &[]);
        b.decorate(scaled, DecorationKind::RelaxedPrecision, &[]);
        b.ret();

        b.begin_block();
        let dead = b.emit_value(Op::FAdd, float, vec![value.into(), value.into()]);
        b.decorate(dead, DecorationKind::RelaxedPrecision, &[]);
        b.ret();
    }

    b.finish()
}

fn bench_finalize(c: &mut Criterion) {
    let config = FinalizeConfig::default().with_vendor_features(VendorFeatures::all());

    for functions in [16, 256] {
        let module = build_module(functions);
        c.bench_function(&format!("finalize/{functions}_functions"), |bencher| {
            bencher.iter_batched(
                || module.clone(),
                |mut module| {
                    let report = finalize(&mut module, &config).expect("synthetic module finalizes");
                    black_box(report);
                    module
                },
                BatchSize::SmallInput,
            )
        });
    }
}

criterion_group!(benches, bench_finalize);
criterion_main!(benches);
