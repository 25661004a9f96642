use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use dataforge::sql::{self, SqlOptions, SqlProfile};
use dataforge::warehouse::WarehouseSchema;
use tempfile::TempDir;

fn generate_sessions(folder: &Path, name: &str, rows: usize) -> PathBuf {
    let csv_path = folder.join(name);
    let mut file = File::create(&csv_path).expect("create csv");
    writeln!(file, "ID,Fecha,Organizacion,Profesional,Precio,Observaciones").expect("header");
    for i in 0..rows {
        let day = (i % 28) + 1;
        let note = match i % 4 {
            0 => "primera sesión",
            1 => "seguimiento, O'Neil",
            2 => "",
            _ => "NA",
        };
        writeln!(
            file,
            "{i},2024-03-{day:02},Org {org},Prof {prof},{price}.50,\"{note}\"",
            org = i % 17,
            prof = i % 41,
            price = 100 + i % 300
        )
        .expect("row");
    }
    csv_path
}

fn bench_sql_generation(c: &mut Criterion) {
    let temp_dir = TempDir::new().expect("temp dir");
    let input = temp_dir.path().join("input");
    std::fs::create_dir_all(&input).expect("input dir");
    generate_sessions(&input, "terapias.csv", 20_000);
    generate_sessions(&input, "chat.csv", 20_000);

    let warehouse = SqlOptions {
        output_file: Some(temp_dir.path().join("warehouse.sql")),
        ..SqlOptions::default()
    };
    let generic = SqlOptions {
        profile: SqlProfile::Generic,
        output_dir: Some(temp_dir.path().join("generic")),
        ..SqlOptions::default()
    };
    let schema = WarehouseSchema::staging_v2();

    let mut group = c.benchmark_group("sql_generation");

    group.bench_function("warehouse_profile", |b| {
        b.iter_batched(
            || (),
            |_| {
                sql::csv_to_insert_sql(&input, &warehouse, schema).expect("warehouse sql");
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("generic_profile", |b| {
        b.iter_batched(
            || (),
            |_| {
                sql::csv_to_insert_sql(&input, &generic, schema).expect("generic sql");
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
    drop(temp_dir);
}

criterion_group!(benches, bench_sql_generation);
criterion_main!(benches);
