//! Generic classfile-specific definitions

/// Header of Java class file (magic number)
pub const MAGIC: u32 = 0xCAFEBABE;

/// Name of a constructor
pub const CONSTRUCTOR_METHOD_NAME: &str = "<init>";

/// Name of a static initializer
pub const STATIC_INITIALIZER_METHOD_NAME: &str = "<clinit>";

/// Root of every class hierarchy
pub const OBJECT_CLASS: &str = "java/lang/Object";

/// Bootstrap class of lambda and method reference call sites
pub const LAMBDA_METAFACTORY: &str = "java/lang/invoke/LambdaMetafactory";

/// `CONSTANT_MethodHandle` reference kind of a static method
pub const REF_INVOKE_STATIC: u8 = 6;

/// JVM version constants
pub mod major_versions {
    pub const JAVA_5_0: u16 = 49;
    pub const JAVA_6_0: u16 = 50;
    pub const JAVA_7: u16 = 51;
    pub const JAVA_8: u16 = 52;
    pub const JAVA_11: u16 = 55;
    pub const JAVA_17: u16 = 61;
    pub const JAVA_21: u16 = 65;
}

/// First class file version that carries StackMapTable frames
pub const FIRST_FRAME_VERSION: u16 = major_versions::JAVA_6_0;

/// Access flags used by the remapper and the frame computer
pub mod access_flags {
    pub const ACC_PUBLIC: u16 = 0x0001;
    pub const ACC_STATIC: u16 = 0x0008;
    pub const ACC_FINAL: u16 = 0x0010;
    pub const ACC_SUPER: u16 = 0x0020;
    pub const ACC_INTERFACE: u16 = 0x0200;
    pub const ACC_ABSTRACT: u16 = 0x0400;
    pub const ACC_SYNTHETIC: u16 = 0x1000;
    pub const ACC_MANDATED: u16 = 0x8000;
}

/// Attribute names the remapper understands
pub mod attribute_names {
    pub const CODE: &str = "Code";
    pub const BOOTSTRAP_METHODS: &str = "BootstrapMethods";
    pub const STACK_MAP_TABLE: &str = "StackMapTable";
    pub const SIGNATURE: &str = "Signature";
    pub const LOCAL_VARIABLE_TABLE: &str = "LocalVariableTable";
    pub const LOCAL_VARIABLE_TYPE_TABLE: &str = "LocalVariableTypeTable";
    pub const INNER_CLASSES: &str = "InnerClasses";
    pub const ENCLOSING_METHOD: &str = "EnclosingMethod";
    pub const METHOD_PARAMETERS: &str = "MethodParameters";
    pub const RECORD: &str = "Record";
    pub const ANNOTATION_DEFAULT: &str = "AnnotationDefault";
    pub const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
    pub const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";
    pub const RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeVisibleParameterAnnotations";
    pub const RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeInvisibleParameterAnnotations";
}
