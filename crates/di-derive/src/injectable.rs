//! Injectable attribute macro implementation
//!
//! Reads the fields of a struct to decide how each dependency is obtained:
//!
//! - `Arc<T>`: resolved with `get_instance` when the factory builds the struct
//! - `Lazy<T>`: a handle from `get_lazy`, resolved on first use
//! - `ScopedProvider<T>`: a handle from `get_provider`, resolved on every `get`
//! - `Injected<T>`: left empty by the factory and filled by member injection
//!
//! `#[inject(named = "...")]` on a field selects a named binding.

use proc_macro::TokenStream;
use proc_macro2::{Ident, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{
    meta::ParseNestedMeta,
    parse::Result,
    parse_macro_input, Error, Fields, GenericArgument, Item, ItemStruct, LitStr, PathArguments,
    PathSegment, Type, TypePath,
};

/// Main implementation function for the injectable macro
pub fn injectable_impl(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut options = InjectableOptions::default();
    let options_parser = syn::meta::parser(|meta| options.parse(meta));
    parse_macro_input!(args with options_parser);

    let input_item = parse_macro_input!(input as Item);

    match process_injectable_item(input_item, &options) {
        Ok(result) => result.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Arguments of `#[injectable(...)]`
#[derive(Debug, Default)]
struct InjectableOptions {
    scope: Option<LitStr>,
    singleton: bool,
    releasable: bool,
}

impl InjectableOptions {
    fn parse(&mut self, meta: ParseNestedMeta) -> Result<()> {
        if meta.path.is_ident("scope") {
            self.scope = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("singleton") {
            self.singleton = true;
            Ok(())
        } else if meta.path.is_ident("releasable") {
            self.releasable = true;
            Ok(())
        } else {
            Err(meta.error(
                "unsupported injectable argument, expected `scope = \"...\"`, `singleton` or `releasable`",
            ))
        }
    }

    /// Annotation of the scope that owns instances, if any.
    ///
    /// A singleton without an explicit scope belongs to the root scope.
    fn scope_annotation(&self) -> Option<TokenStream2> {
        match (&self.scope, self.singleton) {
            (Some(scope), _) => Some(quote!(#scope)),
            (None, true) => Some(quote!(::elif_di::SINGLETON_ANNOTATION)),
            (None, false) => None,
        }
    }
}

/// Process the injectable attribute on different item types
fn process_injectable_item(item: Item, options: &InjectableOptions) -> Result<TokenStream2> {
    match item {
        Item::Struct(mut item_struct) => process_injectable_struct(&mut item_struct, options),
        _ => Err(Error::new_spanned(
            item,
            "#[injectable] can only be applied to structs",
        )),
    }
}

fn process_injectable_struct(
    item_struct: &mut ItemStruct,
    options: &InjectableOptions,
) -> Result<TokenStream2> {
    if options.releasable && !options.singleton {
        return Err(Error::new_spanned(
            &item_struct.ident,
            "`releasable` only applies to a `singleton`",
        ));
    }
    if !item_struct.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &item_struct.generics,
            "#[injectable] does not support generic structs",
        ));
    }

    let dependencies = extract_dependencies(item_struct)?;
    strip_inject_attributes(item_struct);

    let factory = generate_factory(item_struct, &dependencies, options);
    let member_injector = generate_member_injector(item_struct, &dependencies);

    Ok(quote! {
        #item_struct

        #factory

        #member_injector
    })
}

/// How a field gets its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InjectionKind {
    Instance,
    Lazy,
    Provider,
    Member,
}

#[derive(Debug, Clone)]
struct DependencyInfo {
    field_name: Ident,
    dependency_type: Type,
    kind: InjectionKind,
    name: Option<LitStr>,
}

fn extract_dependencies(item_struct: &ItemStruct) -> Result<Vec<DependencyInfo>> {
    match &item_struct.fields {
        Fields::Unit => Ok(Vec::new()),
        Fields::Named(fields) => fields
            .named
            .iter()
            .map(|field| {
                let field_name = field.ident.clone().ok_or_else(|| {
                    Error::new_spanned(field, "expected a named field")
                })?;
                let (kind, dependency_type) = classify_field_type(&field.ty)?;
                let name = binding_name(&field.attrs)?;
                Ok(DependencyInfo {
                    field_name,
                    dependency_type,
                    kind,
                    name,
                })
            })
            .collect(),
        Fields::Unnamed(_) => Err(Error::new_spanned(
            item_struct,
            "#[injectable] requires a struct with named fields or a unit struct",
        )),
    }
}

/// Read `#[inject(named = "...")]`
fn binding_name(attrs: &[syn::Attribute]) -> Result<Option<LitStr>> {
    let mut name = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("inject")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("named") {
                name = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported inject argument, expected `named = \"...\"`"))
            }
        })?;
    }
    Ok(name)
}

fn strip_inject_attributes(item_struct: &mut ItemStruct) {
    for field in item_struct.fields.iter_mut() {
        field.attrs.retain(|attr| !attr.path().is_ident("inject"));
    }
}

fn classify_field_type(field_type: &Type) -> Result<(InjectionKind, Type)> {
    match field_type {
        Type::Path(type_path) => classify_type_path(type_path),
        _ => Err(unsupported_field(field_type)),
    }
}

fn classify_type_path(type_path: &TypePath) -> Result<(InjectionKind, Type)> {
    let segment = type_path
        .path
        .segments
        .last()
        .ok_or_else(|| Error::new_spanned(type_path, "Invalid type path"))?;

    let kind = match segment.ident.to_string().as_str() {
        "Arc" => InjectionKind::Instance,
        "Lazy" => InjectionKind::Lazy,
        "ScopedProvider" => InjectionKind::Provider,
        "Injected" => InjectionKind::Member,
        _ => return Err(unsupported_field(type_path)),
    };

    Ok((kind, extract_generic_type(segment)?))
}

fn unsupported_field(ty: impl quote::ToTokens) -> Error {
    Error::new_spanned(
        ty,
        "Injectable fields must be Arc<T>, Lazy<T>, ScopedProvider<T> or Injected<T>",
    )
}

/// Extract `T` from `Wrapper<T>`
fn extract_generic_type(segment: &PathSegment) -> Result<Type> {
    if let PathArguments::AngleBracketed(args) = &segment.arguments {
        if let Some(GenericArgument::Type(inner_type)) = args.args.first() {
            return Ok(inner_type.clone());
        }
    }

    Err(Error::new_spanned(
        segment,
        format!("Failed to extract generic type from {}<T>", segment.ident),
    ))
}

/// Expression producing the value of a dependency from `scope`
fn resolve_dependency(dependency: &DependencyInfo) -> TokenStream2 {
    let ty = &dependency.dependency_type;
    match (dependency.kind, &dependency.name) {
        (InjectionKind::Instance | InjectionKind::Member, None) => {
            quote!(scope.get_instance::<#ty>()?)
        }
        (InjectionKind::Instance | InjectionKind::Member, Some(name)) => {
            quote!(scope.get_instance_named::<#ty>(#name)?)
        }
        (InjectionKind::Lazy, None) => quote!(scope.get_lazy::<#ty>()),
        (InjectionKind::Lazy, Some(name)) => quote!(scope.get_lazy_named::<#ty>(#name)),
        (InjectionKind::Provider, None) => quote!(scope.get_provider::<#ty>()),
        (InjectionKind::Provider, Some(name)) => quote!(scope.get_provider_named::<#ty>(#name)),
    }
}

fn generate_factory(
    item_struct: &ItemStruct,
    dependencies: &[DependencyInfo],
    options: &InjectableOptions,
) -> TokenStream2 {
    let vis = &item_struct.vis;
    let struct_name = &item_struct.ident;
    let factory_name = format_ident!("{}Factory", struct_name);
    let has_members = dependencies
        .iter()
        .any(|dependency| dependency.kind == InjectionKind::Member);

    let field_initializers = dependencies.iter().map(|dependency| {
        let field_name = &dependency.field_name;
        if dependency.kind == InjectionKind::Member {
            quote!(#field_name: ::elif_di::Injected::new())
        } else {
            let value = resolve_dependency(dependency);
            quote!(#field_name: #value)
        }
    });

    let construct = match item_struct.fields {
        Fields::Unit => quote!(#struct_name),
        _ => quote!(#struct_name { #(#field_initializers),* }),
    };

    let build = if has_members {
        quote! {
            let mut instance = #construct;
            scope.inject(&mut instance)?;
        }
    } else {
        quote!(let instance = #construct;)
    };

    let scope_annotation = options.scope_annotation();
    let has_scope_annotation = scope_annotation.is_some();
    let target_scope = scope_annotation.map(|annotation| {
        quote! {
            fn target_scope(&self, scope: &::elif_di::Scope) -> ::elif_di::InjectionResult<::elif_di::Scope> {
                scope.parent_scope_with_annotation(#annotation)
            }
        }
    });
    let singleton = options.singleton;
    let releasable = options.releasable;
    let doc = format!("Builds [`{}`] for a scope", struct_name);

    quote! {
        #[doc = #doc]
        #[derive(Debug, Default, Clone, Copy)]
        #vis struct #factory_name;

        impl ::elif_di::Factory<#struct_name> for #factory_name {
            fn create_instance(
                &self,
                scope: &::elif_di::Scope,
            ) -> ::elif_di::InjectionResult<::std::sync::Arc<#struct_name>> {
                #build
                Ok(::std::sync::Arc::new(instance))
            }

            #target_scope

            fn has_scope_annotation(&self) -> bool {
                #has_scope_annotation
            }

            fn has_singleton_annotation(&self) -> bool {
                #singleton
            }

            fn has_releasable_annotation(&self) -> bool {
                #releasable
            }
        }
    }
}

fn generate_member_injector(
    item_struct: &ItemStruct,
    dependencies: &[DependencyInfo],
) -> Option<TokenStream2> {
    let members: Vec<&DependencyInfo> = dependencies
        .iter()
        .filter(|dependency| dependency.kind == InjectionKind::Member)
        .collect();
    if members.is_empty() {
        return None;
    }

    let vis = &item_struct.vis;
    let struct_name = &item_struct.ident;
    let injector_name = format_ident!("{}MemberInjector", struct_name);
    let assignments = members.iter().map(|dependency| {
        let field_name = &dependency.field_name;
        let value = resolve_dependency(dependency);
        quote!(target.#field_name.set(#value)?;)
    });
    let doc = format!("Fills the `Injected` members of [`{}`]", struct_name);

    Some(quote! {
        #[doc = #doc]
        #[derive(Debug, Default, Clone, Copy)]
        #vis struct #injector_name;

        impl ::elif_di::MemberInjector<#struct_name> for #injector_name {
            fn inject(
                &self,
                target: &mut #struct_name,
                scope: &::elif_di::Scope,
            ) -> ::elif_di::InjectionResult<()> {
                #(#assignments)*
                Ok(())
            }
        }
    })
}
