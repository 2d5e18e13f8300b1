use rand::rngs::StdRng;
use rand::SeedableRng;

use spbool::{
    generate, transitive_closure, CpuDevice, DeviceBackend, DeviceOperators, EngineConfig,
    Operators, Phase, Recorder, SparseBoolMatrix,
};

fn main() -> spbool::Result<()> {
    println!("spbool {}: sparse boolean matrix algebra", spbool::VERSION);

    let config = EngineConfig::default();
    let backend = DeviceBackend::with_instrument(CpuDevice::new(&config)?, Recorder::new());
    let ops = DeviceOperators::from_backend(backend);
    println!("Operators: {}", ops.name());

    // Two random 10x10 relations
    let mut rng = StdRng::seed_from_u64(42);
    let mut a = generate(10, 10, 0.3, &mut rng)?;
    let b = generate(10, 10, 0.3, &mut rng)?;
    a.set_marker("a");

    println!("\nMatrix A:\n{:?}", a);
    println!("\nMatrix B:\n{:?}", b);

    let sum = ops.add(&a, &b)?;
    println!("\nA + B: {} values", sum.nvals());

    let product = ops.multiply_accumulate(&a, &a, &b)?;
    println!("A + A x B: {} values", product.nvals());

    let closure = transitive_closure(&ops, &a)?;
    println!("Transitive closure of A: {} values", closure.nvals());

    // Transpose and sub-matrix of a small fixed matrix
    let m = SparseBoolMatrix::build(4, 4, &[0, 1, 2, 3, 3, 3, 3], &[0, 1, 2, 0, 1, 2, 3])?;
    let t = ops.transpose(&m)?;
    println!("\nTransposed: {:?}", t.iter().collect::<Vec<_>>());
    println!("Sub-matrix [0..3, 1..4]:\n{:?}", m.submatrix(0, 1, 3, 3)?);
    println!("Row reduction:\n{:?}", m.reduce_rows());

    let k = ops.kronecker(&SparseBoolMatrix::identity(2), &m)?;
    println!("I2 (x) M: {:?} with {} values", k.shape(), k.nvals());

    let recorder = ops.backend().instrument();
    println!("\nDevice timings:");
    println!(
        "  transfers: {} in {:?}",
        recorder.count(Phase::Transfer),
        recorder.total(Phase::Transfer)
    );
    println!(
        "  kernels:   {} in {:?}",
        recorder.count(Phase::Kernel),
        recorder.total(Phase::Kernel)
    );

    Ok(())
}
