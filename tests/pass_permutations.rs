use lantern::renderer::passes::{apply_defines, msaa_defines};
use lantern::renderer::{MsaaSamples, PassKey, Technique};
use std::collections::HashSet;

const MSAA_TECHNIQUES: [Technique; 10] = [
    Technique::GBuffer,
    Technique::LightingMask,
    Technique::LightingPerPixel,
    Technique::LightingPerSample,
    Technique::DebugNormals,
    Technique::DebugDepthGradient,
    Technique::TileCulling,
    Technique::SkyboxToneMap,
    Technique::SkyboxToneMapTiled,
    Technique::ForwardStandard,
];

#[test]
fn every_msaa_technique_has_four_distinct_keys() {
    let mut keys = HashSet::new();
    for technique in MSAA_TECHNIQUES {
        for samples in MsaaSamples::ALL {
            assert!(
                keys.insert(PassKey::new(technique, samples)),
                "duplicate key for {technique:?} at {}x",
                samples.count()
            );
        }
    }
    assert_eq!(keys.len(), MSAA_TECHNIQUES.len() * MsaaSamples::ALL.len());
}

#[test]
fn display_names_are_unique_per_sample_count() {
    let mut names = HashSet::new();
    for technique in MSAA_TECHNIQUES {
        for samples in MsaaSamples::ALL {
            assert!(names.insert(PassKey::new(technique, samples).display_name()));
        }
    }
}

#[test]
fn sample_counts_round_trip_through_keys() {
    for samples in MsaaSamples::ALL {
        let key = PassKey::new(Technique::TileCulling, samples);
        assert!(key.display_name().contains(&format!("{}x", samples.count())));
        assert_eq!(MsaaSamples::from_count(samples.count()), samples);
    }
}

#[test]
fn msaa_macro_substitution_produces_distinct_sources() {
    let source = "const MSAA_SAMPLES: u32 = 1u;\nalias LitTexture = texture_2d<f32>;\nfn f() {}\n";
    let mut variants = HashSet::new();
    for samples in MsaaSamples::ALL {
        let mut defines = msaa_defines(samples);
        if samples.count() > 1 {
            defines.push(("LitTexture", "texture_multisampled_2d<f32>".to_string()));
        }
        let processed = apply_defines(source, &defines);
        assert!(processed.contains(&format!("const MSAA_SAMPLES: u32 = {}u;", samples.count())));
        variants.insert(processed);
    }
    assert_eq!(variants.len(), 4, "sample-count variants must never alias");
}

#[test]
fn single_sample_keys_use_the_x1_slot() {
    let key = PassKey::single(Technique::BlurX);
    assert_eq!(key.samples, MsaaSamples::X1);
    assert_ne!(key, PassKey::single(Technique::BlurY));
}
