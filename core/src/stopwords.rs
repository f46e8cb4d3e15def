//! Built-in stopword lists. The sets are built once on first use and never
//! mutated; callers wanting a different list pass their own to the tokenizer.

use lazy_static::lazy_static;
use std::collections::HashSet;

/// English stopwords, including the apostrophe-free spellings that survive
/// the tokenizer's punctuation filter.
pub const ENGLISH: &[&str] = &[
    "a","about","above","after","again","against","all","also","am","an","and","any","are","aren't","arent","as","at",
    "be","because","been","before","being","below","between","both","but","by",
    "can","can't","cannot","cant","could","couldn't","couldnt",
    "did","didn't","didnt","do","does","doesn't","doesnt","doing","don't","dont","down","during",
    "each","either","else","etc","ever","every",
    "few","for","from","further",
    "get","gets","got",
    "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's","however",
    "i","i'd","i'll","i'm","i've","ie","if","in","into","is","isn't","isnt","it","it's","its","itself",
    "just","let's","lets","may","me","might","more","most","must","mustn't","my","myself",
    "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
    "per","same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
    "than","that","that's","thats","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","thus","to","too",
    "under","until","up","upon","us","very","via",
    "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","whether","which","while","who","who's","whom","why","why's","will","with","won't","wont","would","wouldn't",
    "yet","you","you'd","you'll","you're","you've","your","yours","yourself","yourselves",
];

/// Simplified Chinese stopwords.
pub const CHINESE_SIMPLIFIED: &[&str] = &[
    "的","了","和","是","就","都","而","及","与","着","或","一个","没有","我们","你们","他们","她们","它们",
    "我","你","他","她","它","这","那","这个","那个","这些","那些","之","在","也","于","把","被","让",
    "从","向","对","为","以","因为","所以","但是","但","如果","虽然","而且","并且","然后","还是","还",
    "吗","呢","吧","啊","呀","哦","嗯","么","什么","怎么","为什么","哪","哪里","谁","啥",
    "个","些","又","再","很","更","最","太","已","已经","曾","将","会","能","可以","要","应该",
    "得","地","所","等","等等","其","其中","此","该","各","每","另","另外","即","则","若","便",
    "自己","这样","那样","这里","那里","如何","以及","或者","不过","并","由","由于","关于","通过",
];

/// Traditional Chinese stopwords.
pub const CHINESE_TRADITIONAL: &[&str] = &[
    "的","了","和","是","就","都","而","及","與","著","或","一個","沒有","我們","你們","他們","她們","它們",
    "我","你","他","她","它","這","那","這個","那個","這些","那些","之","在","也","於","把","被","讓",
    "從","向","對","為","以","因為","所以","但是","但","如果","雖然","而且","並且","然後","還是","還",
    "嗎","呢","吧","啊","呀","哦","嗯","麼","什麼","怎麼","為什麼","哪","哪裡","誰","啥",
    "個","些","又","再","很","更","最","太","已","已經","曾","將","會","能","可以","要","應該",
    "得","地","所","等","等等","其","其中","此","該","各","每","另","另外","即","則","若","便",
    "自己","這樣","那樣","這裡","那裡","如何","以及","或者","不過","並","由","由於","關於","透過",
];

lazy_static! {
    pub static ref ENGLISH_SET: HashSet<String> = collect(&[ENGLISH]);
    pub static ref CHINESE_SET: HashSet<String> = collect(&[CHINESE_SIMPLIFIED, CHINESE_TRADITIONAL]);
    pub static ref COMBINED_SET: HashSet<String> =
        collect(&[ENGLISH, CHINESE_SIMPLIFIED, CHINESE_TRADITIONAL]);
}

fn collect(lists: &[&[&str]]) -> HashSet<String> {
    lists
        .iter()
        .flat_map(|list| list.iter())
        .map(|w| w.to_string())
        .collect()
}
