//! WGSL sources for every [`ProgramKind`].
//!
//! All programs share one prelude so they agree on the bind group layout:
//! group 0 holds the per-draw uniform block, group 1 the material textures
//! and the shadow map.

use lumen_render::ProgramKind;

const PRELUDE: &str = r#"
const MAX_LIGHTS: u32 = 5u;

struct GpuLight {
    color_intensity: vec4<f32>,
    position_range: vec4<f32>,
    direction_cone: vec4<f32>,
    params: vec4<f32>,
};

struct DrawUniforms {
    view_proj: mat4x4<f32>,
    model: mat4x4<f32>,
    shadow_view_proj: mat4x4<f32>,
    base_color: vec4<f32>,
    camera_time: vec4<f32>,
    emissive_cutoff: vec4<f32>,
    ambient_bias: vec4<f32>,
    flags: vec4<f32>,
    near_far: vec4<f32>,
    lights: array<GpuLight, MAX_LIGHTS>,
};

@group(0) @binding(0) var<uniform> u: DrawUniforms;

@group(1) @binding(0) var albedo_tex: texture_2d<f32>;
@group(1) @binding(1) var metallic_roughness_tex: texture_2d<f32>;
@group(1) @binding(2) var normal_tex: texture_2d<f32>;
@group(1) @binding(3) var emissive_tex: texture_2d<f32>;
@group(1) @binding(4) var material_sampler: sampler;
@group(1) @binding(5) var shadow_map: texture_depth_2d;
@group(1) @binding(6) var shadow_sampler: sampler_comparison;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    let world = u.model * vec4<f32>(vertex.position, 1.0);
    var out: VertexOutput;
    out.clip_position = u.view_proj * world;
    out.world_position = world.xyz;
    out.world_normal = normalize((u.model * vec4<f32>(vertex.normal, 0.0)).xyz);
    out.uv = vertex.uv;
    return out;
}
"#;

const LIGHTING: &str = r#"
struct Surface {
    position: vec3<f32>,
    normal: vec3<f32>,
    view_dir: vec3<f32>,
    albedo: vec3<f32>,
    shininess: f32,
};

fn light_contribution(light: GpuLight, s: Surface) -> vec3<f32> {
    let kind = u32(light.params.y + 0.5);
    var to_light = -light.direction_cone.xyz;
    var falloff = 1.0;
    if (kind != 2u) {
        let offset = light.position_range.xyz - s.position;
        let dist = length(offset);
        to_light = offset / max(dist, 0.0001);
        falloff = clamp(1.0 - dist / max(light.position_range.w, 0.0001), 0.0, 1.0);
        if (kind == 1u) {
            let spot_cos = dot(-to_light, normalize(light.direction_cone.xyz));
            let cone_cos = cos(radians(light.direction_cone.w));
            if (spot_cos < cone_cos) {
                return vec3<f32>(0.0);
            }
            falloff = falloff * pow(spot_cos, light.params.x);
        }
    }
    let l = normalize(to_light);
    let diffuse = max(dot(s.normal, l), 0.0);
    let half_vec = normalize(l + s.view_dir);
    let specular = pow(max(dot(s.normal, half_vec), 0.0), s.shininess) * 0.25;
    let radiance = light.color_intensity.rgb * light.color_intensity.a * falloff;
    return (s.albedo * diffuse + vec3<f32>(specular)) * radiance;
}

fn shadow_factor(world_position: vec3<f32>) -> f32 {
    if (u.flags.z < 0.5) {
        return 1.0;
    }
    let clip = u.shadow_view_proj * vec4<f32>(world_position, 1.0);
    let ndc = clip.xyz / clip.w;
    let uv = ndc.xy * vec2<f32>(0.5, -0.5) + vec2<f32>(0.5);
    if (any(uv < vec2<f32>(0.0)) || any(uv > vec2<f32>(1.0)) || ndc.z > 1.0) {
        return 1.0;
    }
    return textureSampleCompareLevel(shadow_map, shadow_sampler, uv, ndc.z - u.ambient_bias.w);
}

// Screen-space cotangent frame; the vertex format carries no tangents.
fn perturb_normal(n: vec3<f32>, dp_dx: vec3<f32>, dp_dy: vec3<f32>, duv_dx: vec2<f32>, duv_dy: vec2<f32>, sampled: vec3<f32>) -> vec3<f32> {
    let dp2perp = cross(dp_dy, n);
    let dp1perp = cross(n, dp_dx);
    let t = dp2perp * duv_dx.x + dp1perp * duv_dy.x;
    let b = dp2perp * duv_dx.y + dp1perp * duv_dy.y;
    let inv_max = inverseSqrt(max(dot(t, t), dot(b, b)));
    let tbn = mat3x3<f32>(t * inv_max, b * inv_max, n);
    return normalize(tbn * (sampled * 2.0 - vec3<f32>(1.0)));
}

struct Shaded {
    surface: Surface,
    alpha: f32,
    emissive: vec3<f32>,
};

fn shade_surface(in: VertexOutput) -> Shaded {
    let albedo = textureSample(albedo_tex, material_sampler, in.uv) * u.base_color;
    let metallic_roughness = textureSample(metallic_roughness_tex, material_sampler, in.uv);
    let normal_sample = textureSample(normal_tex, material_sampler, in.uv).xyz;
    let emissive = textureSample(emissive_tex, material_sampler, in.uv).rgb * u.emissive_cutoff.xyz;
    let dp_dx = dpdx(in.world_position);
    let dp_dy = dpdy(in.world_position);
    let duv_dx = dpdx(in.uv);
    let duv_dy = dpdy(in.uv);

    var n = normalize(in.world_normal);
    if (u.flags.y > 0.5) {
        n = perturb_normal(n, dp_dx, dp_dy, duv_dx, duv_dy, normal_sample);
    }

    var out: Shaded;
    out.surface.position = in.world_position;
    out.surface.normal = n;
    out.surface.view_dir = normalize(u.camera_time.xyz - in.world_position);
    out.surface.albedo = albedo.rgb;
    out.surface.shininess = mix(64.0, 4.0, clamp(metallic_roughness.g, 0.0, 1.0));
    out.alpha = albedo.a;
    out.emissive = emissive;
    return out;
}
"#;

const NORMALS: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(normalize(in.world_normal) * 0.5 + vec3<f32>(0.5), 1.0);
}
"#;

const TEXTURE: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(albedo_tex, material_sampler, in.uv) * u.base_color;
    if (color.a < u.emissive_cutoff.w) {
        discard;
    }
    return color;
}
"#;

const UVS: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(fract(in.uv), 0.0, 1.0);
}
"#;

const MULTI_PASS: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let shaded = shade_surface(in);
    if (shaded.alpha < u.emissive_cutoff.w) {
        discard;
    }
    let s = shaded.surface;
    var color = u.ambient_bias.xyz * s.albedo + shaded.emissive;
    if (u.flags.x > 0.5) {
        color = color + light_contribution(u.lights[0], s) * shadow_factor(s.position);
    }
    return vec4<f32>(color, shaded.alpha);
}
"#;

const SINGLE_PASS: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let shaded = shade_surface(in);
    if (shaded.alpha < u.emissive_cutoff.w) {
        discard;
    }
    let s = shaded.surface;
    var color = u.ambient_bias.xyz * s.albedo + shaded.emissive;
    let count = min(u32(u.flags.x + 0.5), MAX_LIGHTS);
    for (var i = 0u; i < count; i = i + 1u) {
        color = color + light_contribution(u.lights[i], s);
    }
    return vec4<f32>(color, shaded.alpha);
}
"#;

const SHADOW_DEPTH: &str = r#"
@fragment
fn fs_main(in: VertexOutput) {
}
"#;

const DEPTH_PREVIEW: &str = r#"
struct PreviewOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_fullscreen(@builtin(vertex_index) index: u32) -> PreviewOutput {
    let corner = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: PreviewOutput;
    out.clip_position = vec4<f32>(corner * 2.0 - vec2<f32>(1.0), 0.0, 1.0);
    out.uv = vec2<f32>(corner.x, 1.0 - corner.y);
    return out;
}

@fragment
fn fs_main(in: PreviewOutput) -> @location(0) vec4<f32> {
    let size = vec2<f32>(textureDimensions(shadow_map));
    let texel = vec2<i32>(clamp(in.uv * size, vec2<f32>(0.0), size - vec2<f32>(1.0)));
    let depth = textureLoad(shadow_map, texel, 0);
    let near = u.near_far.x;
    let far = max(u.near_far.y, near + 0.0001);
    let view_depth = near * far / (far - depth * (far - near));
    let shade = clamp((view_depth - near) / (far - near), 0.0, 1.0);
    return vec4<f32>(vec3<f32>(shade), 1.0);
}
"#;

/// Vertex entry point used by `kind`.
pub fn vertex_entry(kind: ProgramKind) -> &'static str {
    match kind {
        ProgramKind::DepthPreview => "vs_fullscreen",
        _ => "vs_main",
    }
}

/// Complete WGSL module for `kind`.
pub fn program_source(kind: ProgramKind) -> String {
    let body = match kind {
        ProgramKind::Normals => NORMALS,
        ProgramKind::Texture => TEXTURE,
        ProgramKind::Uvs => UVS,
        ProgramKind::SinglePassLighting => SINGLE_PASS,
        ProgramKind::MultiPassLighting => MULTI_PASS,
        ProgramKind::ShadowDepth => SHADOW_DEPTH,
        ProgramKind::DepthPreview => DEPTH_PREVIEW,
    };
    let lighting = match kind {
        ProgramKind::SinglePassLighting | ProgramKind::MultiPassLighting => LIGHTING,
        _ => "",
    };
    format!("{PRELUDE}{lighting}{body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_program_has_both_entry_points() {
        for kind in ProgramKind::ALL {
            let source = program_source(kind);
            assert!(source.contains("fn fs_main"), "{kind:?}");
            assert!(source.contains(&format!("fn {}", vertex_entry(kind))), "{kind:?}");
        }
    }

    #[test]
    fn lighting_helpers_only_in_lit_programs() {
        assert!(program_source(ProgramKind::MultiPassLighting).contains("fn shadow_factor"));
        assert!(program_source(ProgramKind::SinglePassLighting).contains("fn light_contribution"));
        assert!(!program_source(ProgramKind::Normals).contains("fn light_contribution"));
    }

    #[test]
    fn light_array_matches_scene_limit() {
        let source = program_source(ProgramKind::SinglePassLighting);
        assert!(source.contains(&format!("const MAX_LIGHTS: u32 = {}u;", lumen_scene::MAX_LIGHTS)));
    }
}
