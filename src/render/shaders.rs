// Uniform layouts must match `render::uniforms`.

pub const LIGHTING_SHADER: &str = r#"
struct LightColors {
    ambient: vec4<f32>,
    diffuse: vec4<f32>,
    specular: vec4<f32>,
}

struct DirectionalLight {
    direction: vec4<f32>,
    colors: LightColors,
}

struct PointLight {
    position: vec4<f32>,
    // constant, linear, quadratic
    attenuation: vec4<f32>,
    colors: LightColors,
}

struct SpotLight {
    position: vec4<f32>,
    direction: vec4<f32>,
    // inner cutoff, outer cutoff (cosines)
    cutoff: vec4<f32>,
    attenuation: vec4<f32>,
    colors: LightColors,
}

struct LightingGlobals {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    view_position: vec4<f32>,
    directional: DirectionalLight,
    points: array<PointLight, 4>,
    spot: SpotLight,
    // x: specular model (0 Blinn-Phong, 1 Phong)
    options: vec4<u32>,
}

struct ObjectUniform {
    model: mat4x4<f32>,
    normal_matrix: mat3x4<f32>,
    ambient: vec4<f32>,
    diffuse: vec4<f32>,
    // w: shininess
    specular: vec4<f32>,
    // x: opacity
    params: vec4<f32>,
    // x: use textures, y: normal matrix supplied, z: bound texture mask
    flags: vec4<u32>,
}

const MAP_DIFFUSE: u32 = 1u;
const MAP_SPECULAR: u32 = 2u;
const MAP_AMBIENT: u32 = 4u;
const MAP_EMISSION: u32 = 8u;
const MAP_NORMAL: u32 = 16u;

@group(0) @binding(0)
var<uniform> globals: LightingGlobals;

@group(1) @binding(0)
var<uniform> object: ObjectUniform;

@group(2) @binding(0) var diffuse_map: texture_2d<f32>;
@group(2) @binding(1) var specular_map: texture_2d<f32>;
@group(2) @binding(2) var ambient_map: texture_2d<f32>;
@group(2) @binding(3) var emission_map: texture_2d<f32>;
@group(2) @binding(4) var normal_map: texture_2d<f32>;
@group(2) @binding(5) var map_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) tex_coords: vec2<f32>,
    @location(3) tangent: vec3<f32>,
    @location(4) bitangent: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) tex_coords: vec2<f32>,
    @location(3) tangent: vec3<f32>,
    @location(4) bitangent: vec3<f32>,
}

fn safe_normalize(v: vec3<f32>) -> vec3<f32> {
    return select(vec3<f32>(0.0), normalize(v), dot(v, v) > 0.0);
}

// transpose(inverse(m)) from the cofactors of m
fn derive_normal_matrix(m: mat3x3<f32>) -> mat3x3<f32> {
    let c0 = cross(m[1], m[2]);
    let c1 = cross(m[2], m[0]);
    let c2 = cross(m[0], m[1]);
    let det = dot(m[0], c0);
    return mat3x3<f32>(c0, c1, c2) * (1.0 / det);
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world = object.model * vec4<f32>(input.position, 1.0);
    out.clip_position = globals.projection * globals.view * world;
    out.world_position = world.xyz;

    let model3 = mat3x3<f32>(object.model[0].xyz, object.model[1].xyz, object.model[2].xyz);
    var normal_matrix = derive_normal_matrix(model3);
    if object.flags.y != 0u {
        normal_matrix = mat3x3<f32>(
            object.normal_matrix[0].xyz,
            object.normal_matrix[1].xyz,
            object.normal_matrix[2].xyz
        );
    }
    out.normal = normal_matrix * input.normal;
    out.tangent = safe_normalize(model3 * input.tangent);
    out.bitangent = safe_normalize(model3 * input.bitangent);
    out.tex_coords = input.tex_coords;
    return out;
}

struct Surface {
    ambient: vec3<f32>,
    diffuse: vec3<f32>,
    specular: vec3<f32>,
    emission: vec3<f32>,
    shininess: f32,
}

fn has_map(bit: u32) -> bool {
    return (object.flags.z & bit) != 0u;
}

fn specular_term(normal: vec3<f32>, view_dir: vec3<f32>, light_dir: vec3<f32>, shininess: f32) -> f32 {
    if globals.options.x == 1u {
        let reflected = reflect(-light_dir, normal);
        return pow(max(dot(view_dir, reflected), 0.0), shininess);
    }
    let halfway = safe_normalize(light_dir + view_dir);
    return pow(max(dot(normal, halfway), 0.0), shininess);
}

fn evaluate(colors: LightColors, light_dir: vec3<f32>, normal: vec3<f32>, view_dir: vec3<f32>, surface: Surface) -> array<vec3<f32>, 3> {
    let diff = max(dot(light_dir, normal), 0.0);
    let highlight = specular_term(normal, view_dir, light_dir, surface.shininess);
    return array<vec3<f32>, 3>(
        colors.ambient.xyz * surface.ambient,
        colors.diffuse.xyz * diff * surface.diffuse,
        colors.specular.xyz * highlight * surface.specular,
    );
}

fn attenuation(coefficients: vec4<f32>, distance: f32) -> f32 {
    return 1.0 / (coefficients.x + coefficients.y * distance + coefficients.z * 2.0 * distance);
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let uv = input.tex_coords;
    let diffuse_sample = textureSample(diffuse_map, map_sampler, uv).xyz;
    let specular_sample = textureSample(specular_map, map_sampler, uv).xyz;
    let ambient_sample = textureSample(ambient_map, map_sampler, uv).xyz;
    let emission_sample = textureSample(emission_map, map_sampler, uv).xyz;
    let normal_sample = textureSample(normal_map, map_sampler, uv).xyz;

    let textured = object.flags.x != 0u;
    var surface: Surface;
    surface.shininess = object.specular.w;
    surface.ambient = object.ambient.xyz;
    surface.diffuse = object.diffuse.xyz;
    surface.specular = object.specular.xyz;
    surface.emission = vec3<f32>(0.0);

    var normal = safe_normalize(input.normal);
    if textured {
        let white = vec3<f32>(1.0);
        let diffuse_texel = select(white, diffuse_sample, has_map(MAP_DIFFUSE));
        surface.diffuse = diffuse_texel * object.diffuse.xyz;
        surface.ambient = select(diffuse_texel, ambient_sample, has_map(MAP_AMBIENT)) * object.ambient.xyz;
        surface.specular = select(white, specular_sample, has_map(MAP_SPECULAR)) * object.specular.xyz;
        surface.emission = select(vec3<f32>(0.0), emission_sample, has_map(MAP_EMISSION));
        if has_map(MAP_NORMAL) {
            let tbn = mat3x3<f32>(input.tangent, input.bitangent, normal);
            let perturbed = safe_normalize(tbn * (normal_sample * 2.0 - vec3<f32>(1.0)));
            if dot(perturbed, perturbed) > 0.0 {
                normal = perturbed;
            }
        }
    }

    let position = input.world_position;
    let view_dir = safe_normalize(globals.view_position.xyz - position);
    var color = vec3<f32>(0.0);

    let directional = evaluate(
        globals.directional.colors,
        safe_normalize(-globals.directional.direction.xyz),
        normal,
        view_dir,
        surface,
    );
    color += directional[0] + directional[1] + directional[2];

    for (var i = 0u; i < 4u; i = i + 1u) {
        let light = globals.points[i];
        let to_light = light.position.xyz - position;
        let parts = evaluate(light.colors, safe_normalize(to_light), normal, view_dir, surface);
        color += (parts[0] + parts[1] + parts[2]) * attenuation(light.attenuation, length(to_light));
    }

    let spot = globals.spot;
    let to_spot = spot.position.xyz - position;
    let spot_dir = safe_normalize(to_spot);
    let theta = dot(spot_dir, safe_normalize(-spot.direction.xyz));
    let intensity = clamp((theta - spot.cutoff.y) / (spot.cutoff.x - spot.cutoff.y), 0.0, 1.0);
    let spot_parts = evaluate(spot.colors, spot_dir, normal, view_dir, surface);
    color += (spot_parts[0] + (spot_parts[1] + spot_parts[2]) * intensity)
        * attenuation(spot.attenuation, length(to_spot));

    return vec4<f32>(color + surface.emission, object.params.x);
}
"#;

pub const GRID_SHADER: &str = r#"
struct GridUniform {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    inverse_view: mat4x4<f32>,
    inverse_projection: mat4x4<f32>,
    // w: line opacity
    line_color: vec4<f32>,
    // w: axis half-width
    x_axis_color: vec4<f32>,
    z_axis_color: vec4<f32>,
    // near, far, first scale, second scale
    planes: vec4<f32>,
    // depth range near, depth range far
    depth_range: vec4<f32>,
    // x: 1 when clip depth is [0, 1]
    flags: vec4<u32>,
}

@group(0) @binding(0)
var<uniform> grid: GridUniform;

var<private> QUAD: array<vec3<f32>, 6> = array<vec3<f32>, 6>(
    vec3<f32>(1.0, 1.0, 0.0),
    vec3<f32>(-1.0, -1.0, 0.0),
    vec3<f32>(-1.0, 1.0, 0.0),
    vec3<f32>(-1.0, -1.0, 0.0),
    vec3<f32>(1.0, 1.0, 0.0),
    vec3<f32>(1.0, -1.0, 0.0),
);

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) near_point: vec3<f32>,
    @location(1) far_point: vec3<f32>,
}

fn unproject(x: f32, y: f32, z: f32) -> vec3<f32> {
    let point = grid.inverse_view * grid.inverse_projection * vec4<f32>(x, y, z, 1.0);
    return point.xyz / point.w;
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let corner = QUAD[index];
    var out: VertexOutput;
    out.clip_position = vec4<f32>(corner.xy, 0.0, 1.0);
    out.near_point = unproject(corner.x, corner.y, 0.0);
    out.far_point = unproject(corner.x, corner.y, 1.0);
    return out;
}

fn pattern(position: vec3<f32>, scale: f32, footprint: vec2<f32>) -> vec4<f32> {
    let coord = position.xz * scale;
    let derivative = footprint * abs(scale);
    let cell = abs(fract(coord - 0.5) - 0.5) / max(derivative, vec2<f32>(1.17549435e-38));
    let line = min(cell.x, cell.y);

    var color = grid.line_color.xyz;
    let width = grid.x_axis_color.w;
    if abs(position.x) < width * min(derivative.x, 1.0) {
        color = max(color, grid.z_axis_color.xyz);
    }
    if abs(position.z) < width * min(derivative.y, 1.0) {
        color = max(color, grid.x_axis_color.xyz);
    }
    return vec4<f32>(color, grid.line_color.w * (1.0 - min(line, 1.0)));
}

struct FragmentOutput {
    @builtin(frag_depth) depth: f32,
    @location(0) color: vec4<f32>,
}

@fragment
fn fs_main(input: VertexOutput) -> FragmentOutput {
    let t = -input.near_point.y / (input.far_point.y - input.near_point.y);
    let position = input.near_point + t * (input.far_point - input.near_point);
    let footprint = fwidth(position.xz);

    let clip = grid.projection * grid.view * vec4<f32>(position, 1.0);
    let ndc_depth = clip.z / clip.w;
    let range = grid.depth_range;
    let zero_to_one = grid.flags.x != 0u;

    var out: FragmentOutput;
    out.depth = select(
        ((range.y - range.x) * ndc_depth + range.x + range.y) * 0.5,
        range.x + (range.y - range.x) * ndc_depth,
        zero_to_one,
    );

    let near = grid.planes.x;
    let far = grid.planes.y;
    let symmetric = select(ndc_depth, ndc_depth * 2.0 - 1.0, zero_to_one);
    let linear_depth = (2.0 * near * far) / (far + near - symmetric * (far - near)) / far;
    let fade = max(0.5 - linear_depth, 0.0);

    let mask = select(0.0, 1.0, t > 0.0);
    var color = (pattern(position, grid.planes.z, footprint) + pattern(position, grid.planes.w, footprint)) * mask;
    color.w = color.w * fade;
    out.color = color;
    return out;
}
"#;
