use log::warn;

/// Logs the CPU model, complains if it isn't an Intel one.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub fn check_cpu() {
    let cpuid = raw_cpuid::CpuId::new();

    let brand = cpuid.get_processor_brand_string();
    let brand = brand.as_ref().map_or("unknown CPU", |brand| brand.as_str().trim());

    match cpuid.get_vendor_info() {
        Some(vendor) if vendor.as_str() == "GenuineIntel" => log::info!("Running on {brand}"),
        Some(vendor) => warn!(
            "Running on {brand} by {}, the clock layout is only known for Intel-based Eee PC boards",
            vendor.as_str()
        ),
        None => warn!("CPUID reports no vendor, unable to check the CPU")
    }
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
pub fn check_cpu() {
    warn!("Not an x86 CPU, the clock layout is only known for Intel-based Eee PC boards");
}
