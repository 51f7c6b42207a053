use super::{fmt_opt, CommandError, Context};
use crate::cli::DeviceCommands;
use crate::devices::{DeviceEntry, MatchTier};
use crate::domain::models::{DeviceReport, FocalReport};
use crate::services::doctor::run_doctor;
use crate::services::output::{print_one, print_out};
use crate::services::resolver::focal_from_35mm;

fn device_row(d: &DeviceReport) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}",
        d.make,
        d.model,
        d.pixel_pitch_um,
        d.sensor_diagonal_mm,
        fmt_opt(d.focal_length_mm)
    )
}

fn report(entry: &DeviceEntry, tier: &str) -> DeviceReport {
    DeviceReport {
        make: entry.make.clone(),
        model: entry.model.clone(),
        tier: tier.to_string(),
        pixel_pitch_um: entry.spec.pixel_pitch_um,
        sensor_diagonal_mm: entry.spec.sensor_diagonal_mm,
        focal_length_mm: entry.spec.focal_length_mm,
    }
}

pub fn handle_device_commands(ctx: &Context, command: &DeviceCommands) -> anyhow::Result<()> {
    let db = ctx.pipeline.devices();
    match command {
        DeviceCommands::List => {
            let rows: Vec<DeviceReport> = db.entries().iter().map(|e| report(e, "table")).collect();
            print_out(ctx.json, &rows, device_row)?;
        }
        DeviceCommands::Lookup { make, model } => {
            let found = db.lookup(make, model).ok_or_else(|| {
                CommandError::NotFound(format!("no device specification for {make} {model}"))
            })?;
            let out = match found.entry {
                Some(entry) => report(entry, &found.tier.to_string()),
                None => DeviceReport {
                    make: make.clone(),
                    model: model.clone(),
                    tier: found.tier.to_string(),
                    pixel_pitch_um: found.spec.pixel_pitch_um,
                    sensor_diagonal_mm: found.spec.sensor_diagonal_mm,
                    focal_length_mm: found.spec.focal_length_mm,
                },
            };
            if matches!(found.tier, MatchTier::MakeDefault | MatchTier::GlobalDefault) {
                tracing::info!(
                    make = %make,
                    model = %model,
                    tier = %found.tier,
                    "fallback device spec"
                );
            }
            print_one(ctx.json, out, |d| format!("{}\t{}", d.tier, device_row(d)))?;
        }
    }
    Ok(())
}

pub fn handle_focal(ctx: &Context, f35: f64, sensor_diagonal: f64) -> anyhow::Result<()> {
    for (flag, v) in [("f35", f35), ("sensor-diagonal", sensor_diagonal)] {
        if !(v.is_finite() && v > 0.0) {
            return Err(CommandError::InvalidInput(format!(
                "--{flag} must be a positive number, got {v}"
            ))
            .into());
        }
    }
    let out = FocalReport {
        focal_length_35mm: f35,
        sensor_diagonal_mm: sensor_diagonal,
        focal_length_mm: focal_from_35mm(f35, sensor_diagonal),
    };
    print_one(ctx.json, out, |r| format!("{:.2} mm", r.focal_length_mm))
}

pub async fn handle_doctor(ctx: &Context) -> anyhow::Result<()> {
    let report = run_doctor(ctx.pipeline.config(), ctx.config_path.as_deref()).await;
    print_one(ctx.json, report, |r| {
        let mut lines = vec![format!("overall: {}", r.overall)];
        lines.extend(r.checks.iter().map(|c| format!("{}\t{}", c.name, c.status)));
        lines.join("\n")
    })
}
