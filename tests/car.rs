//! Typed encode/decode of the car message.

use blockwire::schema::{
    BlockLayout, CompositeDef, EnumDef, FieldKind, GroupDef, MessageSchema, PrimitiveType,
    SetDef, VarDataDef,
};
use blockwire::{
    CharacterEncoding, CodecOptions, Composite, Error, FieldReader, FieldWriter, LengthWidth,
    MessageDecoder, MessageEncoder, Phase, Result, peek_header, sbe_bitset, sbe_enum,
};
use bytes::Bytes;

sbe_enum! {
    /// Boolean carried as a byte
    pub enum BooleanType: u8 {
        F = 0,
        T = 1,
    }
    null = u8::MAX;
}

sbe_enum! {
    /// Car model code
    pub enum Model: u8 {
        A = b'A',
        B = b'B',
        C = b'C',
    }
    null = 0;
}

sbe_enum! {
    /// Booster kind
    pub enum BoostType: u8 {
        Turbo = b'T',
        Supercharger = b'S',
        Nitrous = b'N',
        Kers = b'K',
    }
    null = 0;
}

sbe_bitset! {
    /// Optional extras
    pub struct OptionalExtras: u8 {
        const SUN_ROOF = 0;
        const SPORTS_PACK = 1;
        const CRUISE_CONTROL = 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Booster {
    boost_type: BoostType,
    horse_power: u8,
}

impl Composite for Booster {
    const ENCODED_LENGTH: usize = 2;

    fn encode(&self, dst: &mut FieldWriter<'_>) -> Result<()> {
        dst.put_enum(0, self.boost_type)?;
        dst.put(1, self.horse_power)
    }

    fn decode(src: &FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            boost_type: src.get_enum(0)?,
            horse_power: src.get(1)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Engine {
    capacity: u16,
    num_cylinders: u8,
    manufacturer_code: [u8; 3],
    efficiency: i8,
    booster: Option<Booster>,
}

impl Composite for Engine {
    const ENCODED_LENGTH: usize = 10;

    fn encode(&self, dst: &mut FieldWriter<'_>) -> Result<()> {
        dst.put(0, self.capacity)?;
        dst.put(2, self.num_cylinders)?;
        dst.put_fixed_bytes(3, 3, &self.manufacturer_code)?;
        dst.put(6, self.efficiency)?;
        match &self.booster {
            Some(booster) => {
                dst.put_enum(7, BooleanType::T)?;
                dst.put_composite(8, booster)
            }
            None => {
                dst.put_enum(7, BooleanType::F)?;
                dst.put_fixed_bytes(8, Booster::ENCODED_LENGTH, &[])
            }
        }
    }

    fn decode(src: &FieldReader<'_>) -> Result<Self> {
        let mut manufacturer_code = [0u8; 3];
        manufacturer_code.copy_from_slice(src.get_fixed_bytes(3, 3)?);
        let booster = match src.get_enum::<BooleanType>(7)? {
            BooleanType::T => Some(src.get_composite(8)?),
            _ => None,
        };
        Ok(Self {
            capacity: src.get(0)?,
            num_cylinders: src.get(2)?,
            manufacturer_code,
            efficiency: src.get(6)?,
            booster,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FuelFigure {
    speed: u16,
    mpg: f32,
    usage_description: String,
}

#[derive(Debug, Clone, PartialEq)]
struct PerformanceFigure {
    octane_rating: u8,
    accelerations: Vec<(u16, f32)>,
}

#[derive(Debug, Clone, PartialEq)]
struct Car {
    serial_number: u64,
    model_year: u16,
    available: BooleanType,
    code: Model,
    some_numbers: [u32; 4],
    vehicle_code: [u8; 6],
    extras: OptionalExtras,
    engine: Engine,
    fuel_figures: Vec<FuelFigure>,
    performance_figures: Vec<PerformanceFigure>,
    manufacturer: String,
    model: String,
    activation_code: Bytes,
}

fn boolean_type() -> EnumDef {
    EnumDef::new("BooleanType", PrimitiveType::UInt8)
        .symbol("F", 0)
        .symbol("T", 1)
}

fn car_schema() -> MessageSchema {
    let booster = CompositeDef::new("Booster")
        .field(
            "boostType",
            FieldKind::Enum(
                EnumDef::new("BoostType", PrimitiveType::Char)
                    .symbol("TURBO", u64::from(b'T'))
                    .symbol("SUPERCHARGER", u64::from(b'S'))
                    .symbol("NITROUS", u64::from(b'N'))
                    .symbol("KERS", u64::from(b'K')),
            ),
        )
        .field("horsePower", FieldKind::Primitive(PrimitiveType::UInt8));
    let engine = CompositeDef::new("Engine")
        .field("capacity", FieldKind::Primitive(PrimitiveType::UInt16))
        .field("numCylinders", FieldKind::Primitive(PrimitiveType::UInt8))
        .field("manufacturerCode", FieldKind::ascii(3))
        .field("efficiency", FieldKind::Primitive(PrimitiveType::Int8))
        .field("boosterEnabled", FieldKind::Enum(boolean_type()))
        .field("booster", FieldKind::Composite(booster));
    let extras = SetDef::new("OptionalExtras", PrimitiveType::UInt8)
        .choice("sunRoof", 0)
        .choice("sportsPack", 1)
        .choice("cruiseControl", 2);
    let model = EnumDef::new("Model", PrimitiveType::Char)
        .symbol("A", u64::from(b'A'))
        .symbol("B", u64::from(b'B'))
        .symbol("C", u64::from(b'C'));

    let fuel_figures = BlockLayout::new()
        .field("speed", FieldKind::Primitive(PrimitiveType::UInt16))
        .field("mpg", FieldKind::Primitive(PrimitiveType::Float))
        .var_data(VarDataDef::new(
            "usageDescription",
            LengthWidth::U32,
            CharacterEncoding::Utf8,
        ));
    let acceleration = BlockLayout::new()
        .field("mph", FieldKind::Primitive(PrimitiveType::UInt16))
        .field("seconds", FieldKind::Primitive(PrimitiveType::Float));
    let performance_figures = BlockLayout::new()
        .field("octaneRating", FieldKind::Primitive(PrimitiveType::UInt8))
        .group(GroupDef::new("acceleration", acceleration));

    MessageSchema::new(
        "Car",
        1,
        1,
        0,
        BlockLayout::new()
            .field("serialNumber", FieldKind::Primitive(PrimitiveType::UInt64))
            .field("modelYear", FieldKind::Primitive(PrimitiveType::UInt16))
            .field("available", FieldKind::Enum(boolean_type()))
            .field("code", FieldKind::Enum(model))
            .field(
                "someNumbers",
                FieldKind::FixedBytes {
                    length: 16,
                    encoding: CharacterEncoding::Raw,
                },
            )
            .field("vehicleCode", FieldKind::ascii(6))
            .field("extras", FieldKind::Set(extras))
            .field("engine", FieldKind::Composite(engine))
            .group(GroupDef::new("fuelFigures", fuel_figures))
            .group(GroupDef::new("performanceFigures", performance_figures))
            .var_data(VarDataDef::new("manufacturer", LengthWidth::U32, CharacterEncoding::Utf8))
            .var_data(VarDataDef::new("model", LengthWidth::U16, CharacterEncoding::Utf8))
            .var_data(VarDataDef::new("activationCode", LengthWidth::U8, CharacterEncoding::Ascii)),
    )
}

fn sample_car() -> Car {
    let mut extras = OptionalExtras::new();
    extras
        .set(OptionalExtras::CRUISE_CONTROL, true)
        .set(OptionalExtras::SPORTS_PACK, true)
        .set(OptionalExtras::SUN_ROOF, false);

    let fuel = |speed, mpg, text: &str| FuelFigure {
        speed,
        mpg,
        usage_description: text.to_owned(),
    };

    Car {
        serial_number: 1234,
        model_year: 2013,
        available: BooleanType::T,
        code: Model::A,
        some_numbers: [1, 2, 3, 4],
        vehicle_code: *b"abcdef",
        extras,
        engine: Engine {
            capacity: 2000,
            num_cylinders: 4,
            manufacturer_code: *b"123",
            efficiency: 35,
            booster: Some(Booster {
                boost_type: BoostType::Nitrous,
                horse_power: 200,
            }),
        },
        fuel_figures: vec![
            fuel(30, 35.9, "Urban Cycle"),
            fuel(55, 49.0, "Combined Cycle"),
            fuel(75, 40.0, "Highway Cycle"),
        ],
        performance_figures: vec![
            PerformanceFigure {
                octane_rating: 95,
                accelerations: vec![(30, 4.0), (60, 7.5), (100, 12.2)],
            },
            PerformanceFigure {
                octane_rating: 99,
                accelerations: vec![(30, 3.8), (60, 7.1), (100, 11.8)],
            },
        ],
        manufacturer: "Honda".to_owned(),
        model: "Civic VTi".to_owned(),
        activation_code: Bytes::from_static(b"abcdef"),
    }
}

fn encode_car(car: &Car, schema: &MessageSchema, buf: &mut [u8], options: CodecOptions) -> Result<usize> {
    let mut encoder = MessageEncoder::new(buf, schema, options)?;
    {
        let mut fields = encoder.fields()?;
        fields.put(0, car.serial_number)?;
        fields.put(8, car.model_year)?;
        fields.put_enum(10, car.available)?;
        fields.put_enum(11, car.code)?;
        for (index, number) in car.some_numbers.iter().enumerate() {
            fields.put(12 + index * 4, *number)?;
        }
        fields.put_fixed_bytes(28, 6, &car.vehicle_code)?;
        fields.put_set(34, car.extras)?;
        fields.put_composite(35, &car.engine)?;
    }

    encoder.begin_group("fuelFigures", car.fuel_figures.len())?;
    for figure in &car.fuel_figures {
        encoder.next_element()?;
        let mut fields = encoder.fields()?;
        fields.put(0, figure.speed)?;
        fields.put(2, figure.mpg)?;
        encoder.put_str("usageDescription", &figure.usage_description)?;
    }
    encoder.end_group()?;

    encoder.begin_group("performanceFigures", car.performance_figures.len())?;
    for figure in &car.performance_figures {
        encoder.next_element()?;
        encoder.fields()?.put(0, figure.octane_rating)?;
        encoder.begin_group("acceleration", figure.accelerations.len())?;
        for (mph, seconds) in &figure.accelerations {
            encoder.next_element()?;
            let mut fields = encoder.fields()?;
            fields.put(0, *mph)?;
            fields.put(2, *seconds)?;
        }
        encoder.end_group()?;
    }
    encoder.end_group()?;

    encoder.put_str("manufacturer", &car.manufacturer)?;
    encoder.put_str("model", &car.model)?;
    encoder.put_var_data("activationCode", &car.activation_code)?;
    encoder.finish()
}

fn decode_car(data: Bytes, schema: &MessageSchema, options: CodecOptions) -> Result<(Car, usize)> {
    let mut decoder = MessageDecoder::new(data, schema, options)?;
    let fields = decoder.fields()?;
    let mut some_numbers = [0u32; 4];
    for (index, number) in some_numbers.iter_mut().enumerate() {
        *number = fields.get(12 + index * 4)?;
    }
    let mut vehicle_code = [0u8; 6];
    vehicle_code.copy_from_slice(fields.get_fixed_bytes(28, 6)?);
    let serial_number = fields.get(0)?;
    let model_year = fields.get(8)?;
    let available = fields.get_enum(10)?;
    let code = fields.get_enum(11)?;
    let extras = fields.get_set(34)?;
    let engine = fields.get_composite(35)?;

    let mut fuel_figures = Vec::with_capacity(decoder.begin_group("fuelFigures")?);
    while decoder.next_element()? {
        let fields = decoder.fields()?;
        let speed = fields.get(0)?;
        let mpg = fields.get(2)?;
        fuel_figures.push(FuelFigure {
            speed,
            mpg,
            usage_description: decoder.get_str("usageDescription")?,
        });
    }
    decoder.end_group()?;

    let mut performance_figures = Vec::new();
    decoder.begin_group("performanceFigures")?;
    while decoder.next_element()? {
        let octane_rating = decoder.fields()?.get(0)?;
        let mut accelerations = Vec::new();
        decoder.begin_group("acceleration")?;
        while decoder.next_element()? {
            let fields = decoder.fields()?;
            accelerations.push((fields.get(0)?, fields.get(2)?));
        }
        decoder.end_group()?;
        performance_figures.push(PerformanceFigure {
            octane_rating,
            accelerations,
        });
    }
    decoder.end_group()?;

    let car = Car {
        serial_number,
        model_year,
        available,
        code,
        some_numbers,
        vehicle_code,
        extras,
        engine,
        fuel_figures,
        performance_figures,
        manufacturer: decoder.get_str("manufacturer")?,
        model: decoder.get_str("model")?,
        activation_code: decoder.get_var_data("activationCode")?,
    };
    let length = decoder.finish()?;
    Ok((car, length))
}

// header 8 + root 45
// + fuelFigures 4 + 3 * (6 + 4) + 11 + 14 + 13
// + performanceFigures 4 + 2 * (1 + 4 + 3 * 6)
// + manufacturer 4 + 5 + model 2 + 9 + activationCode 1 + 6
const CAR_LENGTH: usize = 202;

#[test]
fn test_car_schema_is_valid() {
    let schema = car_schema();
    schema.validate().unwrap();
    assert_eq!(schema.root.block_length, 45);
    assert_eq!(schema.root.groups[0].layout.block_length, 6);
    assert_eq!(schema.root.groups[1].layout.block_length, 1);
}

#[test]
fn test_car_roundtrip() {
    let schema = car_schema();
    let car = sample_car();
    let mut buf = vec![0u8; 1024];
    let len = encode_car(&car, &schema, &mut buf, CodecOptions::strict()).unwrap();
    assert_eq!(len, CAR_LENGTH);

    let (decoded, read) = decode_car(Bytes::copy_from_slice(&buf[..len]), &schema, CodecOptions::strict()).unwrap();
    assert_eq!(read, CAR_LENGTH);
    assert_eq!(decoded, car);
    assert!(decoded.extras.contains(OptionalExtras::CRUISE_CONTROL));
    assert!(!decoded.extras.contains(OptionalExtras::SUN_ROOF));
    assert_eq!(decoded.extras.to_string(), "SPORTS_PACK | CRUISE_CONTROL");
}

#[test]
fn test_car_wire_layout() {
    let schema = car_schema();
    let mut buf = vec![0u8; 1024];
    let len = encode_car(&sample_car(), &schema, &mut buf, CodecOptions::default()).unwrap();

    let header = peek_header(&buf[..len]).unwrap();
    assert_eq!(
        (header.block_length, header.template_id, header.schema_id, header.version),
        (45, 1, 1, 0)
    );
    assert_eq!(&buf[8..16], &1234_u64.to_le_bytes());
    assert_eq!(buf[8 + 11], b'A');
    assert_eq!(&buf[8 + 28..8 + 34], b"abcdef");
    assert_eq!(buf[8 + 34], 0b110);
    // engine.booster
    assert_eq!(&buf[8 + 43..8 + 45], &[b'N', 200]);
    // fuelFigures group header
    assert_eq!(&buf[53..57], &[6, 0, 3, 0]);
    assert_eq!(&buf[len - 7..len], b"\x06abcdef");
}

#[test]
fn test_absent_booster_roundtrip() {
    let schema = car_schema();
    let mut car = sample_car();
    car.engine.booster = None;
    let mut buf = vec![0u8; 1024];
    let len = encode_car(&car, &schema, &mut buf, CodecOptions::default()).unwrap();
    assert_eq!(&buf[8 + 42..8 + 45], &[0, 0, 0]);

    let (decoded, _) = decode_car(Bytes::copy_from_slice(&buf[..len]), &schema, CodecOptions::default()).unwrap();
    assert_eq!(decoded.engine.booster, None);
}

#[test]
fn test_reserved_extras_bits_survive() {
    let schema = car_schema();
    let mut car = sample_car();
    car.extras = OptionalExtras::from_bits(0b1000_0001);
    let mut buf = vec![0u8; 1024];
    let len = encode_car(&car, &schema, &mut buf, CodecOptions::default()).unwrap();

    let (decoded, _) = decode_car(Bytes::copy_from_slice(&buf[..len]), &schema, CodecOptions::default()).unwrap();
    assert_eq!(decoded.extras.reserved_bits(), 0b1000_0000);
    assert!(decoded.extras.contains(OptionalExtras::SUN_ROOF));
    assert_eq!(decoded.extras.bits(), 0b1000_0001);
}

#[test]
fn test_undeclared_model_code() {
    let schema = car_schema();
    let mut buf = vec![0u8; 1024];
    let len = encode_car(&sample_car(), &schema, &mut buf, CodecOptions::default()).unwrap();
    buf[8 + 11] = b'Z';
    let data = Bytes::copy_from_slice(&buf[..len]);

    let (decoded, _) = decode_car(data.clone(), &schema, CodecOptions::lenient()).unwrap();
    assert_eq!(decoded.code, Model::NullValue);
    assert!(matches!(
        decode_car(data, &schema, CodecOptions::strict()),
        Err(Error::UnknownEnumValue { value: 0x5A, .. })
    ));
}

#[test]
fn test_empty_groups_and_var_data() {
    let schema = car_schema();
    let mut car = sample_car();
    car.fuel_figures.clear();
    car.performance_figures.clear();
    car.manufacturer.clear();
    let mut buf = vec![0u8; 1024];
    let len = encode_car(&car, &schema, &mut buf, CodecOptions::default()).unwrap();
    assert_eq!(len, 8 + 45 + 4 + 4 + 4 + 2 + 9 + 1 + 6);

    let (decoded, read) = decode_car(Bytes::copy_from_slice(&buf[..len]), &schema, CodecOptions::default()).unwrap();
    assert_eq!(read, len);
    assert_eq!(decoded, car);
}

#[test]
fn test_out_of_order_access_is_rejected() {
    let schema = car_schema();
    let mut buf = vec![0u8; 1024];
    let mut encoder = MessageEncoder::new(&mut buf, &schema, CodecOptions::default()).unwrap();
    assert_eq!(encoder.phase(), Phase::RootFields);

    assert!(matches!(
        encoder.begin_group("performanceFigures", 1),
        Err(Error::Sequencing { .. })
    ));
    assert!(matches!(
        encoder.put_str("manufacturer", "Honda"),
        Err(Error::Sequencing { .. })
    ));

    encoder.begin_group("fuelFigures", 0).unwrap();
    encoder.end_group().unwrap();
    assert!(matches!(encoder.fields(), Err(Error::Sequencing { .. })));

    encoder.begin_group("performanceFigures", 1).unwrap();
    encoder.next_element().unwrap();
    assert!(matches!(
        encoder.end_group(),
        Err(Error::Sequencing { .. })
    ));
}

#[test]
fn test_skip_groups_to_var_data() {
    let schema = car_schema();
    let mut buf = vec![0u8; 1024];
    let len = encode_car(&sample_car(), &schema, &mut buf, CodecOptions::default()).unwrap();

    let mut decoder = MessageDecoder::new(Bytes::copy_from_slice(&buf[..len]), &schema, CodecOptions::default()).unwrap();
    decoder.skip_group("fuelFigures").unwrap();
    decoder.skip_group("performanceFigures").unwrap();
    assert_eq!(decoder.phase(), Phase::VariableFields);
    assert_eq!(decoder.get_str("manufacturer").unwrap(), "Honda");
    decoder.skip_rest().unwrap();
    assert_eq!(decoder.finish().unwrap(), CAR_LENGTH);
}
